//! Prompt builders, one per oracle-backed stage.
//!
//! Every prompt opens with a `TASK:` line naming the stage. The model
//! ignores it; logs and test doubles use it to tell calls apart.

use super::scope::ResearchScope;

pub const TASK_METADATA: &str = "TASK: metadata_completion";
pub const TASK_RELEVANCY: &str = "TASK: relevancy_check";
pub const TASK_METHODOLOGY: &str = "TASK: methodology_and_models";
pub const TASK_ANALYSIS: &str = "TASK: analysis_and_findings";
pub const TASK_DATASET: &str = "TASK: dataset_properties";
pub const TASK_EXPERIMENTAL_SETUP: &str = "TASK: experimental_setup";

fn hint_block(hints: &[String]) -> String {
    if hints.is_empty() {
        return String::new();
    }
    let mut block = String::from("\n**CRITICAL INSTRUCTIONS:**\n");
    for hint in hints {
        block.push_str("- ");
        block.push_str(hint);
        block.push('\n');
    }
    block
}

pub fn metadata_completion_prompt(
    missing_fields_json: &str,
    extraction_zone: &str,
    keywords_hint: &str,
) -> String {
    format!(
        "{TASK_METADATA}
You are an expert AI assistant that completes a metadata record for a scientific paper.

**CRITICAL INSTRUCTIONS:**
1. Below are the \"MISSING FIELDS\" of the record, all `null`. Your task is to fill them in.
2. Use the \"EXTRACTION ZONE TEXT\" provided as your single source of truth. This text is the first part of the paper.
3. The metadata elements (title, abstract, keywords) may appear in an unusual, non-linear order. Search the entire zone.
4. Use `null` for anything the text does not state. `year` is an integer; `authors`, `author_affiliations` and `keywords` are lists of strings.
5. Your final output must be ONLY a JSON object with exactly the keys listed below.

**MISSING FIELDS (Fill in the blanks):**
{missing_fields_json}

**EXTRACTION ZONE TEXT (Source of truth):**
---
{extraction_zone}

Keywords: {keywords_hint}
---
"
    )
}

pub fn relevancy_prompt(scope: &ResearchScope, abstract_text: &str) -> String {
    format!(
        "{TASK_RELEVANCY}
Is the paper with this abstract relevant to '{topic}'?
Respond with only a JSON object: {{\"relevancy\": true or false}}.
Abstract: --- {abstract_text} ---
",
        topic = scope.topic
    )
}

pub fn methodology_prompt(scope: &ResearchScope, body_text: &str) -> String {
    format!(
        "{TASK_METHODOLOGY}
From the paper text, extract the proposed model name, a detailed methodology summary, the unique selling proposition (USP), and a list of all empirically evaluated methods (proposed + baselines).
{hints}
Output ONLY the JSON.
JSON: {{\"proposed_model_name\":\"\", \"methodology\":\"\", \"usp\":\"\", \"experimental_methods\":[]}}
Paper Text: --- {body_text} ---
",
        hints = hint_block(&scope.hints.methodology)
    )
}

pub fn analysis_prompt(scope: &ResearchScope, body_text: &str) -> String {
    format!(
        "{TASK_ANALYSIS}
From the paper text, extract the problem statement, main findings, author-stated limitations, and future work.
{hints}
Output ONLY the JSON.
JSON: {{\"problem_statement\":\"\", \"main_findings\":\"\", \"limitations\":\"\", \"future_work\":\"\"}}
Paper Text: --- {body_text} ---
",
        hints = hint_block(&scope.hints.analysis)
    )
}

pub fn dataset_prompt(scope: &ResearchScope, body_text: &str) -> String {
    format!(
        "{TASK_DATASET}
From the paper text, extract the dataset's name, source type (real/simulated), granularity/scale, total duration, number of data points, and a brief description.
{hints}
Output ONLY the JSON.
JSON: {{\"dataset_name\":\"\", \"source_type\":\"\", \"granularity_scale\":\"\", \"dataset_duration\":\"\", \"num_data_points\":\"\", \"data_description\":\"\"}}
Paper Text: --- {body_text} ---
",
        hints = hint_block(&scope.hints.dataset)
    )
}

pub fn experimental_setup_prompt(scope: &ResearchScope, body_text: &str) -> String {
    format!(
        "{TASK_EXPERIMENTAL_SETUP}
From the paper text, extract the experimental setup details: train/test split, forecast horizon, data resolution, features used, preprocessing steps, evaluation metrics (as a list of {{\"name\", \"value\"}} objects), and data/code availability.
{hints}
Output ONLY the JSON.
JSON: {{\"train_test_split\":\"\", \"horizon\":\"\", \"resolution\":\"\", \"features_used\":[], \"data_preprocessing\":[], \"metrics\":[], \"data_availability\":\"\", \"code_availability\":\"\"}}
Paper Text: --- {body_text} ---
",
        hints = hint_block(&scope.hints.experimental_setup)
    )
}
