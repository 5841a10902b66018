//! CNF conversion preserves three-valued truth over every assignment.

use std::collections::HashMap;

use relopt::relopt_logical::predicate::{is_cnf, split_conjunction, split_disjunction, to_cnf};
use relopt::{lit, Attribute, DataType, Expr, ExprId, Scalar, Transformed, TreeNode};

struct Vars {
    p: Attribute,
    q: Attribute,
    r: Attribute,
    x: Attribute,
}

impl Vars {
    fn new() -> Self {
        Self {
            p: Attribute::new("p", DataType::Boolean),
            q: Attribute::new("q", DataType::Boolean),
            r: Attribute::new("r", DataType::Boolean),
            x: Attribute::new("x", DataType::Int64),
        }
    }

    fn formulas(&self) -> Vec<Expr> {
        let (p, q, r) = (self.p.to_expr(), self.q.to_expr(), self.r.to_expr());
        let x_big = self.x.to_expr().gt(lit(3i64));
        vec![
            p.clone().and(q.clone()).or(r.clone()),
            p.clone().and(q.clone()).or(r.clone().and(x_big.clone())),
            p.clone().or(q.clone().and(r.clone())).not(),
            p.clone().and(x_big.clone()).not().or(q.clone()),
            p.clone()
                .or(q.clone())
                .and(r.clone().or(x_big.clone().not()))
                .not()
                .or(p.clone().and(r.clone())),
            x_big.clone().is_null().or(p.clone().not().and(q)),
        ]
    }

    fn assignments(&self) -> Vec<HashMap<ExprId, Expr>> {
        let bools = [lit(true), lit(false), Expr::null(DataType::Boolean)];
        let ints = [lit(1i64), lit(5i64), Expr::null(DataType::Int64)];
        let mut out = Vec::new();
        for p in &bools {
            for q in &bools {
                for r in &bools {
                    for x in &ints {
                        out.push(HashMap::from([
                            (self.p.id, p.clone()),
                            (self.q.id, q.clone()),
                            (self.r.id, r.clone()),
                            (self.x.id, x.clone()),
                        ]));
                    }
                }
            }
        }
        out
    }
}

fn eval_under(e: &Expr, values: &HashMap<ExprId, Expr>) -> Scalar {
    let bound = e
        .clone()
        .transform_up(|node| match node {
            Expr::Attribute(a) => match values.get(&a.id) {
                Some(v) => Transformed::yes(v.clone()),
                None => Transformed::no(Expr::Attribute(a)),
            },
            other => Transformed::no(other),
        })
        .data;
    bound.evaluate().unwrap()
}

#[test]
fn test_cnf_equivalent_under_every_assignment() {
    let vars = Vars::new();
    let assignments = vars.assignments();
    for formula in vars.formulas() {
        let cnf = to_cnf(formula.clone());
        for values in &assignments {
            assert_eq!(
                eval_under(&formula, values),
                eval_under(&cnf, values),
                "{formula} vs {cnf}"
            );
        }
    }
}

#[test]
fn test_cnf_output_shape() {
    let vars = Vars::new();
    for formula in vars.formulas() {
        let cnf = to_cnf(formula);
        assert!(is_cnf(&cnf), "not in CNF: {cnf}");
        for clause in split_conjunction(cnf) {
            for atom in split_disjunction(clause) {
                let negated_connective = match &atom {
                    Expr::Unary { child, .. } => matches!(
                        child.as_ref(),
                        Expr::Binary {
                            op: relopt::BinaryOp::And | relopt::BinaryOp::Or,
                            ..
                        }
                    ),
                    _ => false,
                };
                assert!(!negated_connective, "negated connective in {atom}");
                assert!(!matches!(
                    atom,
                    Expr::Binary {
                        op: relopt::BinaryOp::And,
                        ..
                    }
                ));
            }
        }
    }
}

#[test]
fn test_cnf_leaves_conjunctions_alone() {
    let vars = Vars::new();
    let conj = vars.p.to_expr().and(vars.q.to_expr()).and(vars.r.to_expr());
    assert_eq!(to_cnf(conj.clone()), conj);
}

#[test]
fn test_cnf_clause_count_is_product_of_sides() {
    let vars = Vars::new();
    let (p, q, r) = (vars.p.to_expr(), vars.q.to_expr(), vars.r.to_expr());
    let x = vars.x.to_expr().gt(lit(0i64));
    // (p AND q) OR (r AND x) has 2 x 2 clauses.
    let cnf = to_cnf(p.and(q).or(r.and(x)));
    assert_eq!(split_conjunction(cnf).len(), 4);
}
