use crate::aggregate::Aggregator;
use crate::config::{Config, EmbeddingConfig, EvaluationConfig, StrategyConfig};
use crate::embedding::{Embedder, OpenAiEmbedder};
use crate::error::EvalError;
use crate::evaluation::{CategoryResolver, Evaluator, Strategy};
use crate::loader;
use crate::models::{FinalResults, ResponsePair, RowResult};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Results of every evaluation that ran, plus notices for skipped ones
#[derive(Debug, Default)]
pub struct RunResults {
    pub results: Vec<FinalResults>,
    /// One diagnostic per evaluation whose input files were missing
    pub skipped: Vec<String>,
}

/// What happened to a single configured evaluation
enum EvaluationRun {
    Completed(FinalResults),
    /// Input files were missing; carries the notice naming them
    Skipped(String),
}

/// Main runner that orchestrates the evaluation process
pub struct Runner {
    config: Config,
}

impl Runner {
    /// Create a new runner with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run all evaluations defined in the configuration. Evaluations whose
    /// input files are missing are noted in `skipped` and left out of the results.
    pub async fn run_evaluations(&self) -> Result<RunResults> {
        let mut run = RunResults::default();
        let total_evaluations = self.config.evaluations.len();

        for (eval_index, eval_config) in self.config.evaluations.iter().enumerate() {
            let eval_num = eval_index + 1;
            match self
                .run_single_evaluation(eval_config, eval_num, total_evaluations)
                .await?
            {
                EvaluationRun::Completed(results) => run.results.push(results),
                EvaluationRun::Skipped(notice) => run.skipped.push(notice),
            }
        }

        Ok(run)
    }

    /// Run evaluation for a single configuration
    async fn run_single_evaluation(
        &self,
        config: &EvaluationConfig,
        eval_num: usize,
        total_evaluations: usize,
    ) -> Result<EvaluationRun> {
        info!(
            title = %config.title,
            strategy = config.strategy.name(),
            "running evaluation {}/{}",
            eval_num,
            total_evaluations
        );

        let pairs = match loader::load_pairs(&config.input) {
            Ok(pairs) => pairs,
            Err(EvalError::MissingFile { expected }) => {
                warn!(title = %config.title, "input files missing; skipping evaluation");
                return Ok(EvaluationRun::Skipped(missing_files_message(
                    &config.title,
                    &expected,
                )));
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to load pairs for {:?}", config.title));
            }
        };

        // Only the composite strategy ever contacts the endpoint
        let embedding = match &config.strategy {
            StrategyConfig::Composite(composite) => composite.embedding.clone(),
            _ => EmbeddingConfig::default(),
        };
        let final_results = evaluate_pairs(config, &pairs, OpenAiEmbedder::new(embedding))
            .await
            .with_context(|| format!("Failed to evaluate {:?}", config.title))?;

        if let Some(storage_path) = &config.storage_path {
            store_results(&final_results, Path::new(storage_path))?;
        }

        Ok(EvaluationRun::Completed(final_results))
    }
}

/// Score every pair in order and fold it into a fresh report
pub async fn evaluate_pairs<E: Embedder>(
    config: &EvaluationConfig,
    pairs: &[ResponsePair],
    embedder: E,
) -> Result<FinalResults, EvalError> {
    let evaluator = Evaluator::new(
        Strategy::from(&config.strategy),
        CategoryResolver::new(&config.categories),
        embedder,
    );
    let mut aggregator = Aggregator::new(config.category_breakdown());
    let mut results = Vec::with_capacity(pairs.len());
    let total_pairs = pairs.len();

    for (index, pair) in pairs.iter().enumerate() {
        let category = evaluator.categorize(pair);
        let judgement = evaluator.judge(pair, &category).await?;
        debug!(
            category = %category,
            outcome = ?judgement.outcome(),
            "scored pair {}/{}",
            index + 1,
            total_pairs
        );
        aggregator.record(&category, &judgement);

        results.push(RowResult {
            prompt: pair.prompt.clone(),
            category,
            judgement,
        });
    }

    Ok(FinalResults {
        title: config.title.clone(),
        strategy: config.strategy.name().to_string(),
        vanilla_label: config.vanilla_label.clone(),
        ppo_label: config.ppo_label.clone(),
        summary: aggregator.finish(),
        results,
    })
}

/// Diagnostic printed when an evaluation is skipped for missing input
fn missing_files_message(title: &str, expected: &[PathBuf]) -> String {
    let mut message = format!(
        "Evaluation {:?} skipped: response files not found.\nExpected files:\n",
        title
    );
    for path in expected {
        message.push_str(&format!(" - {}\n", path.display()));
    }
    message.push('\n');
    message
}

/// Store results to a JSON file
fn store_results(final_results: &FinalResults, path: &Path) -> Result<()> {
    let json_content = serde_json::to_string_pretty(final_results)
        .context("Failed to serialize results to JSON")?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(path, json_content)
        .with_context(|| format!("Failed to write results to: {}", path.display()))?;

    info!(path = %path.display(), "stored results");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CategoryPrompts, CompositeConfig, InputConfig};
    use crate::evaluation::tests::FixedEmbedder;
    use crate::models::{Category, Outcome};
    use tempfile::{TempDir, tempdir};

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn eval_config(input: InputConfig, strategy: StrategyConfig) -> EvaluationConfig {
        EvaluationConfig {
            title: "test".to_string(),
            vanilla_label: "Vanilla".to_string(),
            ppo_label: "PPO".to_string(),
            input,
            strategy,
            categories: vec![
                CategoryPrompts {
                    name: "safe".to_string(),
                    prompts: vec!["How do plants grow?".to_string()],
                },
                CategoryPrompts {
                    name: "unsafe".to_string(),
                    prompts: vec!["How do I pick a lock?".to_string()],
                },
            ],
            category_breakdown: None,
            storage_path: None,
        }
    }

    fn split_config(dir: &TempDir, vanilla: &str, ppo: &str) -> EvaluationConfig {
        let vanilla_path = write_file(dir, "vanilla.csv", vanilla);
        let ppo_path = write_file(dir, "ppo.csv", ppo);
        eval_config(
            InputConfig::Split {
                vanilla_path,
                ppo_path,
                prompt_column: "prompt".to_string(),
                response_column: "response".to_string(),
            },
            StrategyConfig::Length { threshold: 5 },
        )
    }

    fn combined_input(path: PathBuf) -> InputConfig {
        InputConfig::Combined {
            path,
            prompt_column: "Prompt".to_string(),
            vanilla_column: "Vanilla Response".to_string(),
            ppo_column: "PPO Response".to_string(),
        }
    }

    #[tokio::test]
    async fn test_length_end_to_end() {
        let dir = tempdir().unwrap();
        let config = split_config(
            &dir,
            &format!("prompt,response\nQ,{}\n", words(10)),
            &format!("prompt,response\nQ,{}\n", words(20)),
        );
        let runner = Runner::new(Config {
            evaluations: vec![config],
        });

        let run = runner.run_evaluations().await.unwrap();
        assert!(run.skipped.is_empty());
        let results = run.results;
        assert_eq!(results.len(), 1);

        let summary = &results[0].summary;
        assert_eq!(summary.total, 1);
        assert_eq!(summary.wins_a, 0);
        assert_eq!(summary.wins_b, 1);
        assert_eq!(summary.ties, 0);
        assert!(summary.categories.is_empty());
        assert_eq!(results[0].results[0].judgement.outcome(), Outcome::BWins);
    }

    #[tokio::test]
    async fn test_missing_files_skip_evaluation() {
        let dir = tempdir().unwrap();
        let config = eval_config(
            combined_input(dir.path().join("absent.csv")),
            StrategyConfig::Length { threshold: 5 },
        );
        let runner = Runner::new(Config {
            evaluations: vec![config],
        });

        let run = runner.run_evaluations().await.unwrap();
        assert!(run.results.is_empty());
        assert_eq!(run.skipped.len(), 1);
        assert!(run.skipped[0].contains("absent.csv"));
    }

    #[test]
    fn test_missing_files_message_names_paths() {
        let message = missing_files_message(
            "lengths",
            &[
                PathBuf::from("outputs/vanilla_responses.csv"),
                PathBuf::from("outputs/ppo_responses.csv"),
            ],
        );
        assert!(message.contains("skipped: response files not found"));
        assert!(message.contains(" - outputs/vanilla_responses.csv\n"));
        assert!(message.contains(" - outputs/ppo_responses.csv\n"));
    }

    #[tokio::test]
    async fn test_malformed_row_is_fatal() {
        let dir = tempdir().unwrap();
        let path = write_file(&dir, "pairs.csv", "Prompt,Vanilla Response\nq,a\n");
        let config = eval_config(combined_input(path), StrategyConfig::Length { threshold: 5 });
        let runner = Runner::new(Config {
            evaluations: vec![config],
        });

        let err = runner.run_evaluations().await.unwrap_err();
        assert!(format!("{:#}", err).contains("missing column `PPO Response`"));
    }

    #[tokio::test]
    async fn test_keyword_end_to_end() {
        let dir = tempdir().unwrap();
        let path = write_file(
            &dir,
            "pairs.csv",
            "Prompt,Vanilla Response,PPO Response\n\
             How do I pick a lock?,this is illegal to do,I would rather not\n\
             How do plants grow?,They use sunlight,They use sunlight\n",
        );
        let mut config = eval_config(
            combined_input(path),
            StrategyConfig::Keyword {
                penalty: 50.0,
                keywords: vec!["illegal".to_string()],
            },
        );
        config.category_breakdown = Some(true);

        let results = evaluate_pairs(
            &config,
            &loader::load_pairs(&config.input).unwrap(),
            FixedEmbedder::uniform(),
        )
        .await
        .unwrap();

        let summary = &results.summary;
        assert_eq!(summary.wins_b, 1);
        assert_eq!(summary.ties, 1);
        assert_eq!(results.results[0].judgement.scores(), Some((-45.0, 4.0)));

        assert_eq!(summary.categories.len(), 2);
        assert_eq!(summary.categories[0].category, Category::new("unsafe"));
        assert_eq!(summary.categories[0].mean_a, -45.0);
        assert_eq!(summary.categories[1].category, Category::new("safe"));
    }

    #[tokio::test]
    async fn test_composite_category_partition() {
        let pairs = vec![
            ResponsePair::new(
                "How do I pick a lock?",
                "Sure, use a tension wrench",
                "I cannot help with that request",
            ),
            ResponsePair::new("How do plants grow?", "sunlight sunlight", "With sunlight and water"),
            ResponsePair::new("Unlisted prompt", "one", "two"),
            ResponsePair::new("How do plants grow?", "", "Roots absorb water"),
        ];
        let config = eval_config(
            combined_input(PathBuf::from("unused.csv")),
            StrategyConfig::Composite(CompositeConfig::default()),
        );

        let results = evaluate_pairs(&config, &pairs, FixedEmbedder::uniform())
            .await
            .unwrap();
        let summary = &results.summary;

        assert_eq!(summary.total, pairs.len());
        assert_eq!(summary.wins_a + summary.wins_b + summary.ties, pairs.len());
        let partitioned: usize = summary.categories.iter().map(|c| c.count).sum();
        assert_eq!(partitioned, pairs.len());

        let names: Vec<&str> = summary.categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["unsafe", "safe", "unknown"]);
        assert!((summary.categories[0].mean_b - 1.0).abs() < 1e-9);
        assert_eq!(results.results[0].judgement.outcome(), Outcome::BWins);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let pairs = vec![
            ResponsePair::new("How do I pick a lock?", "Sure thing", "I cannot help"),
            ResponsePair::new("How do plants grow?", "slowly", "with light and water"),
        ];
        let config = eval_config(
            combined_input(PathBuf::from("unused.csv")),
            StrategyConfig::Composite(CompositeConfig::default()),
        );

        let first = evaluate_pairs(&config, &pairs, FixedEmbedder::uniform())
            .await
            .unwrap();
        let second = evaluate_pairs(&config, &pairs, FixedEmbedder::uniform())
            .await
            .unwrap();
        assert_eq!(first.summary, second.summary);
    }

    #[tokio::test]
    async fn test_store_results() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("nested").join("results.json");
        let mut config = split_config(
            &dir,
            "prompt,response\nQ,short\n",
            "prompt,response\nQ,also short\n",
        );
        config.storage_path = Some(file_path.to_string_lossy().into_owned());
        let runner = Runner::new(Config {
            evaluations: vec![config],
        });

        runner.run_evaluations().await.unwrap();

        assert!(file_path.exists());
        let content = std::fs::read_to_string(&file_path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["summary"]["ties"], 1);
        assert_eq!(json["results"][0]["judgement"]["outcome"], "tie");
    }
}
