// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! Static screening of generated SQL before anything touches data.
//! Parsing runs over the full statement list; any statement kind other
//! than a plain query or `CREATE TABLE ... AS SELECT` is rejected, as
//! is any function or relation whose name could reach the filesystem.

use plan_contracts::AnalysisError;
use sqlparser::ast::{Expr, ObjectName, ObjectNamePart, Statement, Visit, Visitor};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::ops::ControlFlow;
use tracing::debug;

const PROHIBITED_NAMES: &[&str] = &[
    "read_csv",
    "read_json",
    "read_ndjson",
    "read_parquet",
    "read_ipc",
    "exec",
    "eval",
    "open",
    "system",
];

/// Parses `code` and returns the vetted statements, ready for
/// execution. Errors are `SyntaxError` for unparseable input and
/// `UnsafeCode` for anything outside the allowed surface.
pub fn validate(code: &str) -> Result<Vec<Statement>, AnalysisError> {
    let statements = Parser::parse_sql(&GenericDialect {}, code)
        .map_err(|e| AnalysisError::SyntaxError(e.to_string()))?;
    if statements.is_empty() {
        return Err(AnalysisError::SyntaxError(
            "no statements found".to_string(),
        ));
    }

    for statement in &statements {
        check_statement_kind(statement)?;

        let mut scanner = NameScanner;
        if let ControlFlow::Break(name) = statement.visit(&mut scanner) {
            debug!(call = %name, "rejecting prohibited call");
            return Err(AnalysisError::UnsafeCode {
                category: format!("disallowed call '{name}'"),
            });
        }
    }

    Ok(statements)
}

fn check_statement_kind(statement: &Statement) -> Result<(), AnalysisError> {
    match statement {
        Statement::Query(_) => Ok(()),
        Statement::CreateTable(create) if create.query.is_some() => Ok(()),
        other => Err(AnalysisError::UnsafeCode {
            category: format!("disallowed statement '{}'", statement_label(other)),
        }),
    }
}

fn statement_label(statement: &Statement) -> String {
    // First keyword of the serialised form is enough to tell the user
    // what was rejected without echoing the whole statement.
    statement
        .to_string()
        .split_whitespace()
        .next()
        .unwrap_or("unknown")
        .to_uppercase()
}

/// Walks every expression and relation looking for prohibited names.
/// Table functions surface as relations, scalar calls as expressions,
/// so both hooks are needed.
struct NameScanner;

impl Visitor for NameScanner {
    type Break = String;

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        check_object_name(relation)
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        if let Expr::Function(function) = expr {
            return check_object_name(&function.name);
        }
        ControlFlow::Continue(())
    }
}

fn check_object_name(name: &ObjectName) -> ControlFlow<String> {
    for part in &name.0 {
        if let ObjectNamePart::Identifier(ident) = part {
            let lowered = ident.value.to_lowercase();
            if PROHIBITED_NAMES.contains(&lowered.as_str()) {
                return ControlFlow::Break(ident.value.clone());
            }
        }
    }
    ControlFlow::Continue(())
}
