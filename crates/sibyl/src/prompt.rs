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

use plan_contracts::PlanRequest;

const SYSTEM_RULES: &str = "\
You are a senior data analyst. You receive: (1) a table registered as `df` and (2) a user's question.
Produce a concise analysis PLAN and minimal, SAFE SQL to compute the answer.

CRITICAL RULES:
- Use ONLY SQL SELECT queries and `CREATE TABLE ... AS SELECT` statements against the provided `df`. No file I/O, no network, no other statement kinds, no writing.
- Do not use table functions that read files (read_csv, read_parquet, read_json and similar). The data is already loaded as `df`.
- The FINAL statement MUST create a table literally named `result`: CREATE TABLE result AS SELECT ...
- ONLY use column names that exist in the table profile provided by the user.
- NEVER invent or assume column names - use only the exact names shown in the profile.
- Prefer set-based operations: GROUP BY with aggregate functions, CASE expressions, window functions, CTEs.
- Avoid correlated row-by-row subqueries unless absolutely necessary.
- If you produce a pivot-style result (e.g. months vs segments), set chart to \"heatmap\".
- Respond in the language you were asked in.

DATE HANDLING:
- Compare date columns against typed date values: WHERE date_col >= CAST('2024-01-01' AS DATE)
- Extract date parts with EXTRACT(YEAR FROM date_col) or DATE_PART.
- Never compare dates to raw strings directly.

CHART SELECTION:
- bar: categorical vs numeric
- line: trends over time
- hist: numeric distribution
- pie: parts of a whole
- heatmap: multi-dimensional pivot
- table: detailed data

Return STRICT JSON per the schema.
";

const FORMAT_INSTRUCTIONS: &str = "\
The output must be a single JSON object with exactly these fields:
{
  \"intent\": string,               // what the user wants, one line
  \"reasoning\": string,            // key steps in plain language
  \"chart\": string,                // one of: bar, line, hist, pie, table, heatmap
  \"transformation_code\": string,  // SQL ending with CREATE TABLE result AS SELECT ...
  \"answer_hint\": string | null    // optional natural-language answer/summary
}
Do not wrap the JSON in markdown fences or add any prose around it.
";

/// Combines the fixed rule block, machine-readable format instructions
/// and the dynamic dataset context into one model request.
pub fn build_request(
    profile: &str,
    question: &str,
    columns: &[String],
    example_categorical: &str,
    example_numeric: &str,
) -> PlanRequest {
    let system_prompt = format!("{SYSTEM_RULES}\n{FORMAT_INSTRUCTIONS}");
    let prompt = format!(
        "Table profile:\n{profile}\n\n\
         Question: {question}\n\n\
         Context:\n\
         - All columns (exact): {columns:?}\n\
         - Example categorical: {example_categorical}\n\
         - Example numeric: {example_numeric}\n\n\
         IMPORTANT REMINDERS:\n\
         - Use set-based SQL; no statements other than SELECT and CREATE TABLE ... AS SELECT.\n\
         - If there are date columns, compare them against typed date values.\n\
         - The final statement must create the table `result`.\n\n\
         GOOD patterns:\n\
         - CREATE TABLE result AS SELECT category, SUM(value) AS total FROM df GROUP BY category\n\
         - CREATE TABLE result AS SELECT * FROM df WHERE date_col >= CAST('2024-01-01' AS DATE)\n\n\
         BAD patterns (avoid):\n\
         - INSERT INTO df ...              -- not a query\n\
         - SELECT * FROM read_csv('x.csv') -- file access\n\
         - WHERE date_col >= '2024-01-01'  -- string vs date\n\n\
         Return JSON ONLY."
    );
    PlanRequest::new(system_prompt, prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_profile_and_rules() {
        let columns = vec!["region".to_string(), "revenue".to_string()];
        let request = build_request("Shape: 2 rows x 2 columns", "total?", &columns, "region", "revenue");
        assert!(request.system_prompt.contains("CREATE TABLE result"));
        assert!(request.system_prompt.contains("transformation_code"));
        assert!(request.prompt.contains("Shape: 2 rows x 2 columns"));
        assert!(request.prompt.contains("total?"));
        assert!(request.prompt.contains("region"));
        assert!((request.temperature - 0.0).abs() < f32::EPSILON);
    }
}
