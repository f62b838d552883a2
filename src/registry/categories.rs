// パス: src/registry/categories.rs
// 役割: コマンドの分類（カテゴリ）とコマンド名から分類への静的対応表
// 意図: エンジンのヘルプデータに分類情報がないため、分類はクレート側で一元管理する
// 関連ファイル: src/registry/mod.rs

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// コマンドの分類（閉じた集合）。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Algebra,
    Arithmetic,
    Calculus,
    Trigonometry,
    LinearAlgebra,
    Polynomials,
    Solving,
    Statistics,
    Complex,
    Lists,
    Logic,
    Other,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Algebra,
        Category::Arithmetic,
        Category::Calculus,
        Category::Trigonometry,
        Category::LinearAlgebra,
        Category::Polynomials,
        Category::Solving,
        Category::Statistics,
        Category::Complex,
        Category::Lists,
        Category::Logic,
        Category::Other,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Algebra => "algebra",
            Category::Arithmetic => "arithmetic",
            Category::Calculus => "calculus",
            Category::Trigonometry => "trigonometry",
            Category::LinearAlgebra => "linear_algebra",
            Category::Polynomials => "polynomials",
            Category::Solving => "solving",
            Category::Statistics => "statistics",
            Category::Complex => "complex",
            Category::Lists => "lists",
            Category::Logic => "logic",
            Category::Other => "other",
        }
    }

    pub fn from_name(name: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const TABLE: &[(Category, &[&str])] = &[
    (
        Category::Algebra,
        &[
            "expand", "factor", "cfactor", "normal", "ratnormal", "simplify", "subst", "numer",
            "denom", "collect", "partfrac", "cpartfrac", "propfrac", "fdistrib", "expexpand",
            "lnexpand", "lncollect", "eval", "evalf", "approx", "exact", "reorder", "convert",
        ],
    ),
    (
        Category::Arithmetic,
        &[
            "gcd", "lcm", "igcd", "ilcm", "iegcd", "iabcuv", "ichinrem", "chinrem", "iquo", "irem",
            "mod", "isprime", "is_prime", "nextprime", "prevprime", "mkisprime", "ifactor",
            "ifactors", "idivis", "euler", "powmod", "factorial", "comb", "binomial", "perm",
            "floor", "ceil", "round", "frac", "abs", "sign", "jacobi_symbol", "legendre_symbol",
            "bernoulli", "randint", "rand",
        ],
    ),
    (
        Category::Calculus,
        &[
            "diff", "integrate", "int", "limit", "series", "taylor", "sum", "product", "romberg",
            "desolve", "odesolve", "laplace", "ilaplace", "grad", "divergence", "curl", "hessian",
            "avgRC", "fourier_an", "fourier_bn", "fourier_cn",
        ],
    ),
    (
        Category::Trigonometry,
        &[
            "sin", "cos", "tan", "cot", "asin", "acos", "atan", "acot", "sinh", "cosh", "tanh",
            "asinh", "acosh", "atanh", "exp", "ln", "log", "log10", "sqrt", "root", "surd",
            "trigexpand", "trigsimplify", "tlin", "tcollect", "texpand", "halftan", "tan2sincos",
            "trigcos", "trigsin", "trigtan", "gamma",
        ],
    ),
    (
        Category::LinearAlgebra,
        &[
            "det", "inv", "tran", "transpose", "trn", "trace", "idn", "identity", "matrix", "dot",
            "cross", "norm", "rank", "ker", "image", "basis", "rref", "lu", "qr", "svd",
            "eigenvals", "eigenvects", "jordan", "charpoly", "pcar", "pmin", "diag", "hilbert",
            "vandermonde", "hadamard", "gramschmidt", "randmatrix", "rowDim", "colDim", "dim",
            "gauss", "companion",
        ],
    ),
    (
        Category::Polynomials,
        &[
            "degree", "ldegree", "valuation", "lcoeff", "tcoeff", "coeff", "coeffs", "symb2poly",
            "poly2symb", "quo", "rem", "gcdex", "resultant", "content", "primpart", "horner",
            "sturm", "cyclotomic", "hermite", "laguerre", "legendre", "interp", "randpoly",
            "divis", "fcoeff", "froot",
        ],
    ),
    (
        Category::Solving,
        &["solve", "csolve", "fsolve", "linsolve", "simult", "roots", "zeros"],
    ),
    (
        Category::Statistics,
        &["mean", "median", "variance", "stddev", "quartiles", "cumSum"],
    ),
    (Category::Complex, &["re", "im", "conj", "arg", "mult_c_conjugate"]),
    (
        Category::Lists,
        &[
            "size", "length", "nops", "concat", "append", "extend", "revlist", "sort", "head",
            "tail", "mid", "seq", "range", "max", "min", "apply", "map", "select", "remove",
            "count", "member", "contains", "find", "set", "union", "intersect", "minus",
        ],
    ),
    (Category::Logic, &["and", "or", "not", "xor", "evalb"]),
];

static BY_NAME: Lazy<HashMap<&'static str, Category>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (category, names) in TABLE {
        for name in *names {
            let previous = map.insert(*name, *category);
            assert!(previous.is_none(), "コマンド `{name}` が複数のカテゴリに属しています");
        }
    }
    map
});

/// 静的表にないコマンドは `Other`。
pub fn category_for(name: &str) -> Category {
    BY_NAME.get(name).copied().unwrap_or(Category::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_and_table_is_consistent() {
        for c in Category::ALL {
            assert_eq!(Category::from_name(c.name()), Some(c));
        }
        assert_eq!(Category::from_name("geometry"), None);
        assert_eq!(category_for("factor"), Category::Algebra);
        assert_eq!(category_for("det"), Category::LinearAlgebra);
        assert_eq!(category_for("plot"), Category::Other);
    }
}
