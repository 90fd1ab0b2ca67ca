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

use plan_contracts::AnalysisError;
use polars::prelude::*;
use sibyl::{validate, SandboxedExecutor};
use std::time::Duration;

fn sales() -> DataFrame {
    df!(
        "region" => ["north", "south", "north", "west"],
        "revenue" => [100.0, 40.0, 60.0, 10.0],
    )
    .unwrap()
}

#[tokio::test]
async fn aggregates_into_the_result_table() {
    let df = sales();
    let statements = validate(
        "CREATE TABLE result AS SELECT region, SUM(revenue) AS total FROM df GROUP BY region",
    )
    .unwrap();
    let result = SandboxedExecutor::default()
        .run(&df, &statements)
        .await
        .unwrap();
    assert_eq!(result.width(), 2);
    assert_eq!(result.height(), 3);
}

#[tokio::test]
async fn missing_result_table_is_an_execution_failure() {
    let df = sales();
    let statements = validate("SELECT * FROM df").unwrap();
    let err = SandboxedExecutor::default()
        .run(&df, &statements)
        .await
        .unwrap_err();
    match err {
        AnalysisError::ExecutionFailed(detail) => {
            assert!(detail.contains("did not set 'result'"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn unknown_columns_fail_execution() {
    let df = sales();
    let statements =
        validate("CREATE TABLE result AS SELECT imaginary FROM df").unwrap();
    let err = SandboxedExecutor::default()
        .run(&df, &statements)
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::ExecutionFailed(_)));
}

#[tokio::test]
async fn each_run_gets_a_fresh_context() {
    let df = sales();
    let executor = SandboxedExecutor::default();
    let first = validate("CREATE TABLE result AS SELECT region FROM df").unwrap();
    executor.run(&df, &first).await.unwrap();

    // the table created by the first run must not leak into the second
    let second = validate("CREATE TABLE final AS SELECT * FROM result").unwrap();
    let err = executor.run(&df, &second).await.unwrap_err();
    assert!(matches!(err, AnalysisError::ExecutionFailed(_)));
}

#[tokio::test]
async fn input_dataset_is_left_untouched() {
    let df = sales();
    let before = df.clone();
    let statements =
        validate("CREATE TABLE result AS SELECT region FROM df WHERE revenue > 50").unwrap();
    SandboxedExecutor::default()
        .run(&df, &statements)
        .await
        .unwrap();
    assert!(df.equals(&before));
}

#[tokio::test]
async fn wall_clock_limit_aborts_slow_runs() {
    let df = sales();
    let statements = validate(
        "CREATE TABLE result AS SELECT a.region FROM df a \
         CROSS JOIN df b CROSS JOIN df c CROSS JOIN df d CROSS JOIN df e",
    )
    .unwrap();
    let err = SandboxedExecutor::new(Duration::from_nanos(1))
        .run(&df, &statements)
        .await
        .unwrap_err();
    match err {
        AnalysisError::ExecutionFailed(detail) => assert!(detail.contains("time limit")),
        other => panic!("unexpected {other:?}"),
    }
}
