//! Partial evaluator over literals and composites.
//!
//! `res_expr` maps an expression to a value in a small literal domain, or
//! `None` when it cannot. It never touches the tree; `materialize` builds
//! fresh nodes for a computed value, so a rejected substitution leaves the
//! arena contents byte-identical when reserialized.

use super::Reducer;
use crate::parser::ast::*;
use crate::span::Span;
use crate::typeck::env::ObjKind;

/// A resolved constant: an integer, string or character literal, or a
/// composite of resolved elements (keeping the original type expression
/// around for printing).
#[derive(Debug, Clone, PartialEq)]
pub enum ResVal {
    Int(i64),
    Str(String),
    Char(char),
    Composite { ty: Option<ExprId>, elts: Vec<ResVal> },
}

impl Reducer<'_> {
    pub(crate) fn res_expr(&self, e: ExprId) -> Option<ResVal> {
        match self.ast.expr(e).clone() {
            Expr::Lit(lit) => lit_val(&lit),
            Expr::Paren(inner) => self.res_expr(inner),
            Expr::Composite { ty, elts } => {
                let elts = elts
                    .iter()
                    .map(|&el| self.res_expr(el))
                    .collect::<Option<Vec<_>>>()?;
                Some(ResVal::Composite { ty, elts })
            }
            Expr::Unary { op, x } => {
                let ResVal::Int(n) = self.res_expr(x)? else { return None };
                match op {
                    UnaryOp::Plus => Some(ResVal::Int(n)),
                    UnaryOp::Minus => n.checked_neg().map(ResVal::Int),
                    _ => None,
                }
            }
            Expr::Binary { op, x, y } => {
                let a = self.res_expr(x)?;
                let b = self.res_expr(y)?;
                match (a, b) {
                    (ResVal::Int(a), ResVal::Int(b)) => {
                        let r = match op {
                            BinOp::Add => a.checked_add(b),
                            BinOp::Sub => a.checked_sub(b),
                            BinOp::Mul => a.checked_mul(b),
                            BinOp::Div => {
                                if b == 0 {
                                    return None;
                                }
                                a.checked_div(b)
                            }
                            _ => None,
                        };
                        r.map(ResVal::Int)
                    }
                    (ResVal::Str(a), ResVal::Str(b)) if op == BinOp::Add => {
                        Some(ResVal::Str(a + &b))
                    }
                    _ => None,
                }
            }
            Expr::Index { x, index } => {
                let ResVal::Int(i) = self.res_expr(index)? else { return None };
                if i < 0 {
                    return None;
                }
                let i = i as usize;
                match self.res_expr(x)? {
                    ResVal::Str(s) => {
                        let b = *s.as_bytes().get(i)?;
                        Some(ResVal::Char(b as char))
                    }
                    ResVal::Composite { elts, .. } => elts.get(i).cloned(),
                    _ => None,
                }
            }
            Expr::Slice { x, low, high, max } => {
                if max.is_some() {
                    return None;
                }
                let lo = match low {
                    Some(e) => match self.res_expr(e)? {
                        ResVal::Int(n) if n >= 0 => Some(n as usize),
                        _ => return None,
                    },
                    None => None,
                };
                let hi = match high {
                    Some(e) => match self.res_expr(e)? {
                        ResVal::Int(n) if n >= 0 => Some(n as usize),
                        _ => return None,
                    },
                    None => None,
                };
                match self.res_expr(x)? {
                    ResVal::Str(s) => {
                        let len = s.len();
                        let (lo, hi) = (lo.unwrap_or(0), hi.unwrap_or(len));
                        if lo > hi || hi > len {
                            return None;
                        }
                        let sub = std::str::from_utf8(&s.as_bytes()[lo..hi]).ok()?;
                        Some(ResVal::Str(sub.to_string()))
                    }
                    ResVal::Composite { ty, elts } => {
                        let len = elts.len();
                        let (lo, hi) = (lo.unwrap_or(0), hi.unwrap_or(len));
                        if lo > hi || hi > len {
                            return None;
                        }
                        Some(ResVal::Composite { ty, elts: elts[lo..hi].to_vec() })
                    }
                    _ => None,
                }
            }
            Expr::Call { fun, args } => {
                let id = self.ast.as_ident(fun)?;
                if args.is_empty() {
                    return None;
                }
                let obj = *self.info.uses.get(&id)?;
                if self.info.obj(obj).kind != ObjKind::Builtin {
                    return None;
                }
                let vals = args
                    .iter()
                    .map(|&a| self.res_expr(a))
                    .collect::<Option<Vec<_>>>()?;
                match self.ast.ident_name(id) {
                    "append" => {
                        let mut iter = vals.into_iter();
                        let ResVal::Composite { ty, mut elts } = iter.next()? else {
                            return None;
                        };
                        elts.extend(iter);
                        Some(ResVal::Composite { ty, elts })
                    }
                    "len" => match vals.into_iter().next()? {
                        ResVal::Str(s) => Some(ResVal::Int(s.len() as i64)),
                        ResVal::Composite { elts, .. } => Some(ResVal::Int(elts.len() as i64)),
                        _ => None,
                    },
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Build fresh nodes for a resolved value. Composite type expressions
    /// are deep-copied so the new tree shares nothing with the old one.
    pub(crate) fn materialize(&mut self, val: ResVal, span: Span) -> ExprId {
        match val {
            ResVal::Int(n) => self.ast.push_expr(
                Expr::Lit(Lit { kind: LitKind::Int, value: n.to_string() }),
                span,
            ),
            ResVal::Str(s) => self.ast.push_expr(
                Expr::Lit(Lit { kind: LitKind::Str, value: quote_str(&s) }),
                span,
            ),
            ResVal::Char(c) => self.ast.push_expr(
                Expr::Lit(Lit { kind: LitKind::Char, value: quote_char(c) }),
                span,
            ),
            ResVal::Composite { ty, elts } => {
                let ty = ty.map(|t| self.ast.clone_expr(t));
                let elts = elts
                    .into_iter()
                    .map(|v| self.materialize(v, span))
                    .collect();
                self.ast.push_expr(Expr::Composite { ty, elts }, span)
            }
        }
    }

    /// Whether the resolved value is just the expression itself: a literal
    /// resolving to its own value. Substituting those would churn the memo.
    pub(crate) fn res_is_self(&self, e: ExprId, val: &ResVal) -> bool {
        match self.ast.expr(e) {
            Expr::Lit(lit) => lit_val(lit).as_ref() == Some(val),
            _ => false,
        }
    }
}

fn lit_val(lit: &Lit) -> Option<ResVal> {
    match lit.kind {
        LitKind::Int => lit.value.parse::<i64>().ok().map(ResVal::Int),
        LitKind::Str => unquote(&lit.value).map(ResVal::Str),
        LitKind::Char => unquote(&lit.value)
            .and_then(|s| s.chars().next())
            .map(ResVal::Char),
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{reducer, text};
    use super::*;
    use proptest::prelude::*;

    /// Resolve the sole argument of the `print` call in `main`.
    fn resolve_print_arg(expr_src: &str) -> Option<ResVal> {
        let src = format!("package main\n\nfunc main() {{\n\tprint({})\n}}\n", expr_src);
        let mut log = Vec::new();
        let r = reducer(&src, ".", &mut log);
        let arg = print_arg(&r.ast);
        let before_exprs = r.ast.exprs.len();
        let before_text = text(&r);
        let val = r.res_expr(arg);
        // The resolver must not mutate its input, resolvable or not.
        assert_eq!(r.ast.exprs.len(), before_exprs);
        assert_eq!(text(&r), before_text);
        val
    }

    fn print_arg(ast: &Ast) -> ExprId {
        ast.exprs
            .iter()
            .enumerate()
            .find_map(|(i, e)| match &e.node {
                Expr::Call { fun, args } => match ast.expr(*fun) {
                    Expr::Ident(id) if ast.ident_name(*id) == "print" => {
                        Some(args[0])
                    }
                    _ => None,
                },
                _ => None,
            })
            .expect("no print call in fixture")
    }

    #[test]
    fn double_negation_matches_plain_literal() {
        assert_eq!(resolve_print_arg("-(-7)"), resolve_print_arg("7"));
    }

    #[test]
    fn len_of_string_literal() {
        assert_eq!(resolve_print_arg("len(\"abc\")"), Some(ResVal::Int(3)));
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(
            resolve_print_arg("\"a\" + \"b\""),
            Some(ResVal::Str("ab".into()))
        );
    }

    #[test]
    fn append_concatenates_composites() {
        let Some(ResVal::Composite { elts, .. }) =
            resolve_print_arg("append([]int{1, 2}, 3)")
        else {
            panic!("append did not resolve to a composite");
        };
        assert_eq!(elts, vec![ResVal::Int(1), ResVal::Int(2), ResVal::Int(3)]);
    }

    #[test]
    fn slice_and_index_of_composites() {
        let Some(ResVal::Composite { elts, .. }) =
            resolve_print_arg("[]int{1, 2, 3, 4}[1:3]")
        else {
            panic!("slice did not resolve");
        };
        assert_eq!(elts, vec![ResVal::Int(2), ResVal::Int(3)]);
        assert_eq!(
            resolve_print_arg("[]int{1, 2, 3, 4}[1:3][0]"),
            Some(ResVal::Int(2))
        );
    }

    #[test]
    fn string_index_yields_byte_char() {
        assert_eq!(resolve_print_arg("\"abc\"[1]"), Some(ResVal::Char('b')));
    }

    #[test]
    fn bottoms() {
        // Out-of-range, division by zero, kind mismatch, unknown callee.
        assert_eq!(resolve_print_arg("\"abc\"[9]"), None);
        assert_eq!(resolve_print_arg("[]int{1}[0:5]"), None);
        assert_eq!(resolve_print_arg("1 / 0"), None);
        assert_eq!(resolve_print_arg("1 + \"a\""), None);
        assert_eq!(resolve_print_arg("undefined_thing"), None);
        assert_eq!(resolve_print_arg("1 % 2"), None);
    }

    #[test]
    fn three_index_slices_are_not_resolved() {
        assert_eq!(resolve_print_arg("[]int{1, 2, 3}[0:2:3]"), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn integer_arithmetic_resolves(a in -1000i64..1000, b in -1000i64..1000) {
            prop_assert_eq!(
                resolve_print_arg(&format!("{} + {}", a, b)),
                Some(ResVal::Int(a + b))
            );
            prop_assert_eq!(
                resolve_print_arg(&format!("{} * {}", a, b)),
                Some(ResVal::Int(a * b))
            );
        }

        #[test]
        fn negation_is_involutive(n in -1000i64..1000) {
            prop_assert_eq!(
                resolve_print_arg(&format!("-(-({}))", n)),
                Some(ResVal::Int(n))
            );
        }
    }
}
