// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! AST node shapes for the SQL-like language of §6.1.
//!
//! Tokenising and grammar are treated as an external collaborator's
//! concern (§1); this module only defines the node shapes the planner
//! consumes, plus the hand-written recursive-descent parser in
//! [`super::parser`] that produces them for the CLI.

use std::fmt;

/// One statement of the grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable {
        name: String,
        file: String,
        using: Vec<IndexKind>,
    },
    Insert {
        table: String,
        values: Vec<Literal>,
    },
    Delete {
        table: String,
        predicate: Predicate,
    },
    Select {
        columns: Columns,
        table: String,
        using: Option<IndexKind>,
        predicate: Option<Predicate>,
        explain: Option<ExplainMode>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplainMode {
    Plan,
    Analyze,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Columns {
    All,
    List(Vec<String>),
}

/// `<idx>` token: `ISAM | HASH | AVL | BTREE | RTREE | ALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Isam,
    Hash,
    Avl,
    BTree,
    RTree,
    All,
}

impl IndexKind {
    pub fn name(&self) -> &'static str {
        match self {
            IndexKind::Isam => "ISAM",
            IndexKind::Hash => "HASH",
            IndexKind::Avl => "AVL",
            IndexKind::BTree => "BTREE",
            IndexKind::RTree => "RTREE",
            IndexKind::All => "ALL",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A WHERE-clause predicate tree. `Leaf` covers every `simple` production
/// of the grammar; `And`/`Or` compose leaves and subtrees.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Leaf(SimplePredicate),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimplePredicate {
    Cmp {
        attr: String,
        op: CmpOp,
        value: Literal,
    },
    Between {
        attr: String,
        lo: Literal,
        hi: Literal,
    },
    Like {
        attr: String,
        pattern: String,
    },
    SpatialIn {
        point: (f64, f64),
        radius_km: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
}

impl CmpOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Gt => ">",
            CmpOp::Lt => "<",
            CmpOp::Ge => ">=",
            CmpOp::Le => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Literal {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Number(n) => Some(*n),
            Literal::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Literal::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Text(s) => Some(s),
            _ => None,
        }
    }
}
