pub const SYSTEM_PROMPT: &str = "You extract the training datasets of machine learning models \
from research papers. Answer with a single JSON object of the form \
{\"datasets\": [{\"name\": string, \"type\": \"public_dataset\" | \"synthetic\", \
\"source\": string | null, \"context\": string, \"hf_url\": string | null}]}. \
Only list data the model was trained or fine-tuned on, not evaluation benchmarks. \
For synthetic data, put the generating model in \"source\".";

pub fn user_prompt(model_id: &str, arxiv_url: &str, paper_text: &str) -> String {
    format!("Model: {model_id}\nPaper: {arxiv_url}\n\nPaper text:\n{paper_text}")
}
