// パス: src/engine/builtin/mod.rs
// 役割: 純 Rust の組み込みエンジン（値のアリーナと Engine 実装）
// 意図: libgiac なしでバインディング層全体を動かし、テストできるようにする
// 関連ファイル: src/engine/mod.rs, src/engine/builtin/eval.rs, src/engine/builtin/commands.rs
//! 組み込みエンジン
//!
//! - 値は参照カウント付きスロットのアリーナに置き、空きスロットは free list で再利用する。
//! - `RawId` はスロット番号と世代を 32bit ずつ詰めたもの。解放後の古い id は世代で弾く。
//! - ヘルプデータは `help.txt` を起動時に一度だけ読み込む。

mod calculus;
mod commands;
mod eval;
mod functions;
mod gen;
mod lexer;
mod ops;
mod parser;
mod poly;
mod printer;

use once_cell::sync::Lazy;
use tracing::{debug, trace};

use self::eval::Evaluator;
use self::gen::Gen;
use super::{Engine, HelpRecord, RawId, Scalar, Subtype, TypeTag, View};
use crate::errors::{GiacError, GiacResult};

const HELP_SOURCE: &str = include_str!("help.txt");

static HELP_RECORDS: Lazy<Vec<HelpRecord>> = Lazy::new(|| parse_help(HELP_SOURCE));

/// `name|description|related,...|example;...` 形式のヘルプ表を読む。
fn parse_help(src: &str) -> Vec<HelpRecord> {
    let split_list = |s: &str, sep: char| -> Vec<String> {
        s.split(sep)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    };
    src.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|line| {
            let mut fields = line.splitn(4, '|');
            let name = fields.next()?.trim();
            if name.is_empty() {
                return None;
            }
            Some(HelpRecord {
                name: name.to_string(),
                description: fields.next().unwrap_or("").trim().to_string(),
                related: split_list(fields.next().unwrap_or(""), ','),
                examples: split_list(fields.next().unwrap_or(""), ';'),
            })
        })
        .collect()
}

#[derive(Debug)]
struct Slot {
    gen: Gen,
    refs: usize,
    generation: u32,
}

#[derive(Debug, Default)]
pub struct BuiltinEngine {
    slots: Vec<Option<Slot>>,
    generations: Vec<u32>,
    free: Vec<usize>,
    live: usize,
    evaluator: Evaluator,
}

impl BuiltinEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, gen: Gen) -> RawId {
        let index = match self.free.pop() {
            Some(i) => i,
            None => {
                self.slots.push(None);
                self.generations.push(0);
                self.slots.len() - 1
            }
        };
        let generation = self.generations[index].wrapping_add(1);
        self.generations[index] = generation;
        self.slots[index] = Some(Slot {
            gen,
            refs: 1,
            generation,
        });
        self.live += 1;
        RawId(((generation as u64) << 32) | index as u64)
    }

    fn slot_index(id: RawId) -> (usize, u32) {
        ((id.0 & 0xFFFF_FFFF) as usize, (id.0 >> 32) as u32)
    }

    fn slot(&self, id: RawId) -> GiacResult<&Slot> {
        let (index, generation) = Self::slot_index(id);
        match self.slots.get(index) {
            Some(Some(slot)) if slot.generation == generation => Ok(slot),
            _ => Err(GiacError::released_handle()),
        }
    }

    fn slot_mut(&mut self, id: RawId) -> GiacResult<&mut Slot> {
        let (index, generation) = Self::slot_index(id);
        match self.slots.get_mut(index) {
            Some(Some(slot)) if slot.generation == generation => Ok(slot),
            _ => Err(GiacError::released_handle()),
        }
    }

    fn gen(&self, id: RawId) -> GiacResult<&Gen> {
        self.slot(id).map(|s| &s.gen)
    }
}

fn scalar(g: &Gen) -> Scalar {
    match g {
        Gen::Int(i) => Scalar::Int(i.clone()),
        Gen::Frac(q) => Scalar::Rational(q.clone()),
        Gen::Double(d) => Scalar::Float(*d),
        _ => Scalar::Float(g.to_f64().unwrap_or(f64::NAN)),
    }
}

impl Engine for BuiltinEngine {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn eval(&mut self, src: &str) -> GiacResult<RawId> {
        debug!(target: "giac::engine", src, "builtin eval");
        let statements = parser::parse_program(src)?;
        let mut last = None;
        for stmt in statements {
            last = Some(self.evaluator.eval(stmt)?);
        }
        let value = last.ok_or_else(|| GiacError::parse("PAR010", "空の入力です"))?;
        Ok(self.alloc(value))
    }

    fn apply(&mut self, command: &str, args: &[RawId]) -> GiacResult<RawId> {
        debug!(target: "giac::engine", command, argc = args.len(), "builtin apply");
        let values = args
            .iter()
            .map(|id| self.gen(*id).cloned())
            .collect::<GiacResult<Vec<_>>>()?;
        let value = self.evaluator.apply(command, values)?;
        Ok(self.alloc(value))
    }

    fn print(&self, id: RawId) -> GiacResult<String> {
        Ok(printer::print(self.gen(id)?))
    }

    fn type_tag(&self, id: RawId) -> GiacResult<(TypeTag, Subtype)> {
        Ok(self.gen(id)?.type_tag())
    }

    fn view(&mut self, id: RawId) -> GiacResult<View> {
        let g = self.gen(id)?.clone();
        let (_, subtype) = g.type_tag();
        let view = match g {
            Gen::Bool(b) => View::Bool(b),
            Gen::Int(i) => match i64::try_from(&i) {
                Ok(v) => View::Int(v),
                Err(_) => View::Zint(i),
            },
            Gen::Frac(q) => View::Frac(q),
            Gen::Double(d) => View::Float(d),
            Gen::Cplx(re, im) => View::Cplx(scalar(&re), scalar(&im)),
            Gen::Idnt(n) => View::Idnt(n),
            Gen::Str(s) => View::Str(s),
            Gen::Vect(items, _) => {
                let items = items.into_iter().map(|g| self.alloc(g)).collect();
                View::Vect { items, subtype }
            }
            Gen::Symb(op, args) => {
                let args = args.into_iter().map(|g| self.alloc(g)).collect();
                View::Symb { op, args }
            }
        };
        Ok(view)
    }

    fn retain(&mut self, id: RawId) -> GiacResult<RawId> {
        self.slot_mut(id)?.refs += 1;
        Ok(id)
    }

    fn release(&mut self, id: RawId) {
        let (index, _) = Self::slot_index(id);
        let Ok(slot) = self.slot_mut(id) else {
            trace!(target: "giac::engine", id = id.0, "release of unknown id ignored");
            return;
        };
        slot.refs -= 1;
        if slot.refs == 0 {
            self.slots[index] = None;
            self.free.push(index);
            self.live -= 1;
            trace!(target: "giac::engine", id = id.0, "slot freed");
        }
    }

    fn live_handles(&self) -> usize {
        self.live
    }

    fn help_records(&self) -> Vec<HelpRecord> {
        HELP_RECORDS.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_table_parses_every_line() {
        let records = parse_help(HELP_SOURCE);
        assert!(records.len() > 200);
        let factor = records.iter().find(|r| r.name == "factor").unwrap();
        assert!(factor.related.contains(&"expand".to_string()));
        assert!(factor.examples.contains(&"factor(x^2-1)".to_string()));
    }

    #[test]
    fn every_builtin_command_has_help() {
        let records = parse_help(HELP_SOURCE);
        for spec in commands::BUILTINS {
            assert!(
                records.iter().any(|r| r.name == spec.name),
                "missing help for {}",
                spec.name
            );
        }
    }

    #[test]
    fn eval_print_and_release() {
        let mut engine = BuiltinEngine::new();
        let id = engine.eval("factor(x^2-1)").unwrap();
        assert_eq!(engine.print(id).unwrap(), "(x-1)*(x+1)");
        assert_eq!(engine.live_handles(), 1);
        engine.release(id);
        assert_eq!(engine.live_handles(), 0);
        assert_eq!(engine.print(id).unwrap_err().code(), "MEM001");
    }

    #[test]
    fn stale_ids_do_not_alias_reused_slots() {
        let mut engine = BuiltinEngine::new();
        let a = engine.eval("1").unwrap();
        engine.release(a);
        let b = engine.eval("2").unwrap();
        assert_ne!(a, b);
        assert!(engine.print(a).is_err());
        assert_eq!(engine.print(b).unwrap(), "2");
    }

    #[test]
    fn retain_keeps_slot_alive_until_last_release() {
        let mut engine = BuiltinEngine::new();
        let id = engine.eval("x+1").unwrap();
        engine.retain(id).unwrap();
        engine.release(id);
        assert_eq!(engine.print(id).unwrap(), "x+1");
        engine.release(id);
        assert_eq!(engine.live_handles(), 0);
    }

    #[test]
    fn view_allocates_children() {
        let mut engine = BuiltinEngine::new();
        let id = engine.eval("[1,2/3,x]").unwrap();
        let view = engine.view(id).unwrap();
        assert_eq!(view.children().len(), 3);
        assert_eq!(engine.live_handles(), 4);
        assert!(matches!(engine.view(view.children()[1]).unwrap(), View::Frac(_)));
    }

    #[test]
    fn apply_uses_handles_directly() {
        let mut engine = BuiltinEngine::new();
        let e = engine.eval("x^3").unwrap();
        let x = engine.eval("x").unwrap();
        let d = engine.apply("diff", &[e, x]).unwrap();
        assert_eq!(engine.print(d).unwrap(), "3*x^2");
    }

    #[test]
    fn booleans_keep_their_subtype() {
        let mut engine = BuiltinEngine::new();
        let id = engine.eval("1 < 2").unwrap();
        assert_eq!(engine.type_tag(id).unwrap(), (TypeTag::Int, Subtype::Boolean));
        assert_eq!(engine.view(id).unwrap(), View::Bool(true));
    }
}
