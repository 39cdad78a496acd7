// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Hand-written recursive-descent parser for the grammar of §6.1.
//!
//! No external SQL parsing library: the grammar is small and fixed, so a
//! direct-slicing parser keeps the dependency surface minimal rather than
//! pulling in a general-purpose SQL grammar crate for five productions.

use super::ast::{CmpOp, Columns, ExplainMode, IndexKind, Literal, Predicate, SimplePredicate, Statement};
use crate::error::{CatalogError, CatalogResult};

pub fn parse(input: &str) -> CatalogResult<Statement> {
    let mut p = Parser::new(input);
    let stmt = p.parse_statement()?;
    p.skip_ws();
    if !p.at_end() {
        return Err(p.err("trailing input after statement"));
    }
    Ok(stmt)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Parser { src, pos: 0 }
    }

    fn err(&self, reason: &str) -> CatalogError {
        CatalogError::ParseError {
            reason: reason.to_string(),
            position: self.pos,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.rest().chars().next() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn peek_keyword(&mut self, kw: &str) -> bool {
        self.skip_ws();
        let rest = self.rest();
        rest.len() >= kw.len()
            && rest[..kw.len()].eq_ignore_ascii_case(kw)
            && rest[kw.len()..]
                .chars()
                .next()
                .map(|c| !c.is_alphanumeric() && c != '_')
                .unwrap_or(true)
    }

    fn expect_keyword(&mut self, kw: &str) -> CatalogResult<()> {
        if self.peek_keyword(kw) {
            self.skip_ws();
            self.pos += kw.len();
            Ok(())
        } else {
            Err(self.err(&format!("expected keyword {kw}")))
        }
    }

    fn try_keyword(&mut self, kw: &str) -> bool {
        if self.peek_keyword(kw) {
            self.skip_ws();
            self.pos += kw.len();
            true
        } else {
            false
        }
    }

    fn expect_char(&mut self, c: char) -> CatalogResult<()> {
        self.skip_ws();
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else {
            Err(self.err(&format!("expected '{c}'")))
        }
    }

    fn try_char(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn identifier(&mut self) -> CatalogResult<String> {
        self.skip_ws();
        let rest = self.rest();
        let end = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(self.err("expected identifier"));
        }
        let ident = rest[..end].to_string();
        self.pos += end;
        Ok(ident)
    }

    fn quoted_string(&mut self) -> CatalogResult<String> {
        self.skip_ws();
        let quote = self
            .rest()
            .chars()
            .next()
            .filter(|c| *c == '"' || *c == '\'')
            .ok_or_else(|| self.err("expected quoted string"))?;
        self.pos += 1;
        let start = self.pos;
        let end = self.rest().find(quote).ok_or_else(|| self.err("unterminated string"))?;
        let text = self.src[start..start + end].to_string();
        self.pos = start + end + 1;
        Ok(text)
    }

    fn number(&mut self) -> CatalogResult<f64> {
        self.skip_ws();
        let rest = self.rest();
        let mut end = 0;
        let bytes = rest.as_bytes();
        if end < bytes.len() && (bytes[end] == b'-' || bytes[end] == b'+') {
            end += 1;
        }
        while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
            end += 1;
        }
        if end == 0 {
            return Err(self.err("expected number"));
        }
        let text = &rest[..end];
        let value: f64 = text.parse().map_err(|_| self.err("invalid number"))?;
        self.pos += end;
        Ok(value)
    }

    fn literal(&mut self) -> CatalogResult<Literal> {
        self.skip_ws();
        let c = self.rest().chars().next().ok_or_else(|| self.err("expected literal"))?;
        if c == '"' || c == '\'' {
            return Ok(Literal::Text(self.quoted_string()?));
        }
        if self.try_keyword("TRUE") {
            return Ok(Literal::Bool(true));
        }
        if self.try_keyword("FALSE") {
            return Ok(Literal::Bool(false));
        }
        Ok(Literal::Number(self.number()?))
    }

    fn parse_statement(&mut self) -> CatalogResult<Statement> {
        if self.try_keyword("CREATE") {
            return self.parse_create_table();
        }
        if self.try_keyword("INSERT") {
            return self.parse_insert();
        }
        if self.try_keyword("DELETE") {
            return self.parse_delete();
        }
        if self.try_keyword("EXPLAIN") {
            let mode = if self.try_keyword("ANALYZE") {
                ExplainMode::Analyze
            } else {
                ExplainMode::Plan
            };
            let mut select = self.parse_select()?;
            if let Statement::Select { explain, .. } = &mut select {
                *explain = Some(mode);
            }
            return Ok(select);
        }
        if self.peek_keyword("SELECT") {
            return self.parse_select();
        }
        Err(self.err("expected CREATE, INSERT, DELETE, SELECT or EXPLAIN"))
    }

    fn parse_create_table(&mut self) -> CatalogResult<Statement> {
        self.expect_keyword("TABLE")?;
        let name = self.identifier()?;
        self.expect_keyword("FROM")?;
        self.expect_keyword("FILE")?;
        let file = self.quoted_string()?;
        let mut using = Vec::new();
        if self.try_keyword("USING") {
            using.push(self.index_kind()?);
            while self.try_char(',') {
                using.push(self.index_kind()?);
            }
        }
        Ok(Statement::CreateTable { name, file, using })
    }

    fn parse_insert(&mut self) -> CatalogResult<Statement> {
        self.expect_keyword("INTO")?;
        let table = self.identifier()?;
        self.expect_keyword("VALUES")?;
        self.expect_char('(')?;
        let mut values = vec![self.literal()?];
        while self.try_char(',') {
            values.push(self.literal()?);
        }
        self.expect_char(')')?;
        Ok(Statement::Insert { table, values })
    }

    fn parse_delete(&mut self) -> CatalogResult<Statement> {
        self.expect_keyword("FROM")?;
        let table = self.identifier()?;
        self.expect_keyword("WHERE")?;
        let predicate = self.parse_predicate()?;
        Ok(Statement::Delete { table, predicate })
    }

    fn parse_select(&mut self) -> CatalogResult<Statement> {
        self.expect_keyword("SELECT")?;
        let columns = self.parse_columns()?;
        self.expect_keyword("FROM")?;
        let table = self.identifier()?;
        let using = if self.try_keyword("USING") {
            Some(self.index_kind()?)
        } else {
            None
        };
        let predicate = if self.try_keyword("WHERE") {
            Some(self.parse_predicate()?)
        } else {
            None
        };
        Ok(Statement::Select {
            columns,
            table,
            using,
            predicate,
            explain: None,
        })
    }

    fn parse_columns(&mut self) -> CatalogResult<Columns> {
        self.skip_ws();
        if self.try_char('*') {
            return Ok(Columns::All);
        }
        let mut cols = vec![self.identifier()?];
        while self.try_char(',') {
            cols.push(self.identifier()?);
        }
        Ok(Columns::List(cols))
    }

    fn index_kind(&mut self) -> CatalogResult<IndexKind> {
        for (kw, kind) in [
            ("ISAM", IndexKind::Isam),
            ("HASH", IndexKind::Hash),
            ("AVL", IndexKind::Avl),
            ("BTREE", IndexKind::BTree),
            ("RTREE", IndexKind::RTree),
            ("ALL", IndexKind::All),
        ] {
            if self.try_keyword(kw) {
                return Ok(kind);
            }
        }
        Err(self.err("expected index kind (ISAM, HASH, AVL, BTREE, RTREE or ALL)"))
    }

    /// `pred := simple | pred AND pred | pred OR pred | ( pred )`.
    /// AND binds tighter than OR (§6.1); parsed as two precedence levels.
    fn parse_predicate(&mut self) -> CatalogResult<Predicate> {
        let mut left = self.parse_and_chain()?;
        while self.try_keyword("OR") {
            let right = self.parse_and_chain()?;
            left = Predicate::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and_chain(&mut self) -> CatalogResult<Predicate> {
        let mut left = self.parse_predicate_atom()?;
        while self.try_keyword("AND") {
            let right = self.parse_predicate_atom()?;
            left = Predicate::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_predicate_atom(&mut self) -> CatalogResult<Predicate> {
        if self.try_char('(') {
            let inner = self.parse_predicate()?;
            self.expect_char(')')?;
            return Ok(inner);
        }
        Ok(Predicate::Leaf(self.parse_simple()?))
    }

    fn parse_simple(&mut self) -> CatalogResult<SimplePredicate> {
        let attr = self.identifier()?;
        if self.try_keyword("BETWEEN") {
            let lo = self.literal()?;
            self.expect_keyword("AND")?;
            let hi = self.literal()?;
            return Ok(SimplePredicate::Between { attr, lo, hi });
        }
        if self.try_keyword("LIKE") {
            let pattern = self.quoted_string()?;
            return Ok(SimplePredicate::Like { attr, pattern });
        }
        if self.try_keyword("IN") {
            self.expect_char('(')?;
            self.expect_keyword("POINT")?;
            self.expect_char('[')?;
            let x = self.number()?;
            self.expect_char(',')?;
            let y = self.number()?;
            self.expect_char(']')?;
            self.expect_char(',')?;
            self.expect_keyword("RADIUS")?;
            let radius_km = self.number()?;
            self.expect_char(')')?;
            return Ok(SimplePredicate::SpatialIn {
                point: (x, y),
                radius_km,
            });
        }
        let op = self.cmp_op()?;
        let value = self.literal()?;
        Ok(SimplePredicate::Cmp { attr, op, value })
    }

    fn cmp_op(&mut self) -> CatalogResult<CmpOp> {
        self.skip_ws();
        for (sym, op) in [(">=", CmpOp::Ge), ("<=", CmpOp::Le), ("=", CmpOp::Eq), (">", CmpOp::Gt), ("<", CmpOp::Lt)] {
            if self.rest().starts_with(sym) {
                self.pos += sym.len();
                return Ok(op);
            }
        }
        Err(self.err("expected comparison operator"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_select_with_equality() {
        let stmt = parse(r#"SELECT * FROM r WHERE restaurant_id = 6317637"#).unwrap();
        match stmt {
            Statement::Select { table, predicate, .. } => {
                assert_eq!(table, "r");
                assert!(matches!(predicate, Some(Predicate::Leaf(_))));
            }
            _ => panic!("expected Select"),
        }
    }

    #[test]
    fn parses_compound_and_with_forced_index() {
        let stmt = parse(
            r#"SELECT name, city FROM r USING HASH WHERE city = "Makati City" AND rating > 4.0"#,
        )
        .unwrap();
        match stmt {
            Statement::Select { using, predicate, .. } => {
                assert_eq!(using, Some(IndexKind::Hash));
                assert!(matches!(predicate, Some(Predicate::And(_, _))));
            }
            _ => panic!("expected Select"),
        }
    }

    #[test]
    fn parses_spatial_in_predicate() {
        let stmt = parse(
            r#"SELECT * FROM r WHERE coords IN (POINT [121.0275,14.56], RADIUS 3)"#,
        )
        .unwrap();
        match stmt {
            Statement::Select { predicate: Some(Predicate::Leaf(SimplePredicate::SpatialIn { point, radius_km })), .. } => {
                assert_eq!(point, (121.0275, 14.56));
                assert_eq!(radius_km, 3.0);
            }
            _ => panic!("expected spatial predicate"),
        }
    }

    #[test]
    fn parses_create_table_using_list() {
        let stmt = parse(r#"CREATE TABLE r FROM FILE "data.csv" USING ISAM, RTREE"#).unwrap();
        match stmt {
            Statement::CreateTable { name, file, using } => {
                assert_eq!(name, "r");
                assert_eq!(file, "data.csv");
                assert_eq!(using, vec![IndexKind::Isam, IndexKind::RTree]);
            }
            _ => panic!("expected CreateTable"),
        }
    }

    #[test]
    fn explain_analyze_sets_mode() {
        let stmt = parse("EXPLAIN ANALYZE SELECT * FROM r WHERE votes > 10").unwrap();
        match stmt {
            Statement::Select { explain, .. } => assert_eq!(explain, Some(ExplainMode::Analyze)),
            _ => panic!("expected Select"),
        }
    }
}
