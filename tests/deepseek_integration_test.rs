use essay_grader::ai_provider::AiProvider;
use essay_grader::grader::{Grader, GradingClient};
use essay_grader_common::{build_grading_prompt, extract_score};

#[tokio::test]
async fn deepseek_grading_integration() {
    let api_key = match std::env::var("DEEPSEEK_API_KEY") {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            eprintln!("DEEPSEEK_API_KEY not set; skipping integration test");
            return;
        }
    };

    let client = GradingClient::new(AiProvider::Deepseek, api_key, false);
    let prompt = build_grading_prompt(
        "My Favourite Season",
        "Total 15 points: content 5, language 5, structure 5.",
        "My favourite season is autumn. The weather is cool and the trees turn gold. \
         I like to walk in the park with my family and collect leaves.",
    );

    let grading = client.grade(&prompt).await;
    assert!(!grading.is_failed(), "grading failed: {}", grading.text);
    assert!(grading.usage.is_some());
    assert!(extract_score(&grading.text).is_some(), "no score in: {}", grading.text);
}
