//! mlog code generation.
//!
//! Lowers the parsed program to Mindustry logic instructions in three
//! steps: generate (with symbolic labels), resolve labels to
//! instruction indices, print. Jumps are emitted so a false condition
//! skips the guarded block.

use crate::parser::{BinaryOp, Expr, Stmt, UnaryOp};

/// An mlog instruction, with labels still symbolic.
#[derive(Debug, Clone, PartialEq)]
enum Instr {
    Set { target: String, value: String },
    Op {
        op: &'static str,
        target: String,
        left: String,
        right: String,
    },
    Print { value: String },
    JumpAlways { label: usize },
    /// Jump taken when `left == right`.
    JumpEqual {
        label: usize,
        left: String,
        right: String,
    },
    /// Pseudo-instruction, removed during label resolution.
    Label(usize),
    End,
}

/// Generates mlog text for a parsed program.
pub fn generate(program: &[Stmt]) -> String {
    let mut gen = Generator {
        instructions: Vec::new(),
        next_temp: 0,
        next_label: 0,
    };
    for stmt in program {
        gen.stmt(stmt);
    }
    gen.instructions.push(Instr::End);
    render(&gen.instructions)
}

struct Generator {
    instructions: Vec<Instr>,
    next_temp: usize,
    next_label: usize,
}

impl Generator {
    fn temp(&mut self) -> String {
        let name = format!("__tmp{}", self.next_temp);
        self.next_temp += 1;
        name
    }

    fn label(&mut self) -> usize {
        let id = self.next_label;
        self.next_label += 1;
        id
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assign { name, value } => self.expr_into(value, name.clone()),
            Stmt::Print { args, newline } => {
                for arg in args {
                    let operand = self.expr(arg);
                    self.instructions.push(Instr::Print { value: operand });
                }
                if *newline {
                    self.instructions.push(Instr::Print {
                        value: "\"\\n\"".into(),
                    });
                }
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                let cond_operand = self.expr(cond);
                let else_label = self.label();
                self.instructions.push(Instr::JumpEqual {
                    label: else_label,
                    left: cond_operand,
                    right: "false".into(),
                });
                for stmt in then_body {
                    self.stmt(stmt);
                }
                if else_body.is_empty() {
                    self.instructions.push(Instr::Label(else_label));
                } else {
                    let end_label = self.label();
                    self.instructions.push(Instr::JumpAlways { label: end_label });
                    self.instructions.push(Instr::Label(else_label));
                    for stmt in else_body {
                        self.stmt(stmt);
                    }
                    self.instructions.push(Instr::Label(end_label));
                }
            }
            Stmt::While { cond, body } => {
                let start_label = self.label();
                let exit_label = self.label();
                self.instructions.push(Instr::Label(start_label));
                let cond_operand = self.expr(cond);
                self.instructions.push(Instr::JumpEqual {
                    label: exit_label,
                    left: cond_operand,
                    right: "false".into(),
                });
                for stmt in body {
                    self.stmt(stmt);
                }
                self.instructions.push(Instr::JumpAlways { label: start_label });
                self.instructions.push(Instr::Label(exit_label));
            }
        }
    }

    /// Evaluates an expression into a fresh operand, reusing literals
    /// and variables directly instead of copying them through temps.
    fn expr(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Number(text) => text.clone(),
            Expr::Str(text) => format!("\"{}\"", text),
            Expr::Var(name) => name.clone(),
            Expr::Unary { .. } | Expr::Binary { .. } => {
                let target = self.temp();
                self.expr_into(expr, target.clone());
                target
            }
        }
    }

    /// Evaluates an expression directly into `target`.
    fn expr_into(&mut self, expr: &Expr, target: String) {
        match expr {
            Expr::Number(_) | Expr::Str(_) | Expr::Var(_) => {
                let value = self.expr(expr);
                self.instructions.push(Instr::Set { target, value });
            }
            Expr::Unary { op, operand } => {
                let operand = self.expr(operand);
                let instr = match op {
                    UnaryOp::Neg => Instr::Op {
                        op: "sub",
                        target,
                        left: "0".into(),
                        right: operand,
                    },
                    UnaryOp::Not => Instr::Op {
                        op: "equal",
                        target,
                        left: operand,
                        right: "false".into(),
                    },
                };
                self.instructions.push(instr);
            }
            Expr::Binary { op, lhs, rhs } => {
                let left = self.expr(lhs);
                let right = self.expr(rhs);
                self.instructions.push(Instr::Op {
                    op: binary_op_name(*op),
                    target,
                    left,
                    right,
                });
            }
        }
    }
}

fn binary_op_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "add",
        BinaryOp::Sub => "sub",
        BinaryOp::Mul => "mul",
        BinaryOp::Div => "div",
        BinaryOp::Mod => "mod",
        BinaryOp::Eq => "equal",
        BinaryOp::Ne => "notEqual",
        BinaryOp::Lt => "lessThan",
        BinaryOp::Le => "lessThanEq",
        BinaryOp::Gt => "greaterThan",
        BinaryOp::Ge => "greaterThanEq",
        BinaryOp::And => "land",
        BinaryOp::Or => "or",
    }
}

/// Resolves labels to instruction indices and prints the program.
fn render(instructions: &[Instr]) -> String {
    // First pass: label id -> index of the next real instruction.
    let mut addresses = std::collections::HashMap::new();
    let mut index = 0usize;
    for instr in instructions {
        match instr {
            Instr::Label(id) => {
                addresses.insert(*id, index);
            }
            _ => index += 1,
        }
    }

    let mut out = String::new();
    for instr in instructions {
        match instr {
            Instr::Label(_) => {}
            Instr::Set { target, value } => {
                out.push_str(&format!("set {} {}\n", target, value));
            }
            Instr::Op {
                op,
                target,
                left,
                right,
            } => {
                out.push_str(&format!("op {} {} {} {}\n", op, target, left, right));
            }
            Instr::Print { value } => {
                out.push_str(&format!("print {}\n", value));
            }
            Instr::JumpAlways { label } => {
                out.push_str(&format!("jump {} always\n", addresses[label]));
            }
            Instr::JumpEqual { label, left, right } => {
                out.push_str(&format!("jump {} equal {} {}\n", addresses[label], left, right));
            }
            Instr::End => out.push_str("end\n"),
        }
    }
    out
}
