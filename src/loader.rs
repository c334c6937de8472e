use crate::config::InputConfig;
use crate::error::EvalError;
use crate::models::ResponsePair;
use csv::{ErrorKind, ReaderBuilder, StringRecord};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Load every response pair described by the input configuration
pub fn load_pairs(input: &InputConfig) -> Result<Vec<ResponsePair>, EvalError> {
    ensure_present(input.expected_paths())?;

    match input {
        InputConfig::Split {
            vanilla_path,
            ppo_path,
            prompt_column,
            response_column,
        } => load_split(vanilla_path, ppo_path, prompt_column, response_column),
        InputConfig::Combined {
            path,
            prompt_column,
            vanilla_column,
            ppo_column,
        } => load_combined(path, prompt_column, vanilla_column, ppo_column),
    }
}

fn ensure_present(expected: Vec<PathBuf>) -> Result<(), EvalError> {
    if expected.iter().all(|path| path.exists()) {
        Ok(())
    } else {
        Err(EvalError::MissingFile { expected })
    }
}

/// Two positionally aligned files; the longer one is truncated
fn load_split(
    vanilla_path: &Path,
    ppo_path: &Path,
    prompt_column: &str,
    response_column: &str,
) -> Result<Vec<ResponsePair>, EvalError> {
    let vanilla = read_columns(vanilla_path, &[prompt_column, response_column])?;
    let ppo = read_columns(ppo_path, &[response_column])?;

    if vanilla.len() != ppo.len() {
        warn!(
            vanilla_rows = vanilla.len(),
            ppo_rows = ppo.len(),
            "response files differ in length; truncating to the shorter one"
        );
    }

    let pairs: Vec<ResponsePair> = vanilla
        .into_iter()
        .zip(ppo)
        .map(|(mut v, mut p)| {
            let response_b = p.swap_remove(0);
            let response_a = v.swap_remove(1);
            let prompt = v.swap_remove(0);
            ResponsePair::new(prompt, response_a, response_b)
        })
        .collect();

    debug!(
        vanilla = %vanilla_path.display(),
        ppo = %ppo_path.display(),
        pairs = pairs.len(),
        "loaded split response files"
    );

    Ok(pairs)
}

fn load_combined(
    path: &Path,
    prompt_column: &str,
    vanilla_column: &str,
    ppo_column: &str,
) -> Result<Vec<ResponsePair>, EvalError> {
    let rows = read_columns(path, &[prompt_column, vanilla_column, ppo_column])?;

    let pairs: Vec<ResponsePair> = rows
        .into_iter()
        .map(|mut row| {
            let response_b = row.swap_remove(2);
            let response_a = row.swap_remove(1);
            let prompt = row.swap_remove(0);
            ResponsePair::new(prompt, response_a, response_b)
        })
        .collect();

    debug!(path = %path.display(), pairs = pairs.len(), "loaded combined response file");

    Ok(pairs)
}

/// Read the named columns of every row, in the order given
fn read_columns(path: &Path, columns: &[&str]) -> Result<Vec<Vec<String>>, EvalError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
    let indices = column_indices(path, &headers, columns)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| csv_error(path, e))?;
        let line = record.position().map_or(0, |p| p.line());

        let mut values = Vec::with_capacity(indices.len());
        for (&idx, name) in indices.iter().zip(columns) {
            match record.get(idx) {
                Some(value) => values.push(value.to_string()),
                None => {
                    return Err(EvalError::MalformedRow {
                        path: path.to_path_buf(),
                        line,
                        reason: format!("missing field `{}`", name),
                    });
                }
            }
        }
        rows.push(values);
    }

    Ok(rows)
}

fn column_indices(
    path: &Path,
    headers: &StringRecord,
    columns: &[&str],
) -> Result<Vec<usize>, EvalError> {
    columns
        .iter()
        .map(|name| {
            headers
                .iter()
                .position(|h| h == *name)
                .ok_or_else(|| EvalError::MalformedRow {
                    path: path.to_path_buf(),
                    line: 1,
                    reason: format!("missing column `{}`", name),
                })
        })
        .collect()
}

/// I/O failures stay `Csv`; anything about the content is a malformed row
fn csv_error(path: &Path, error: csv::Error) -> EvalError {
    match error.kind() {
        ErrorKind::Io(_) => EvalError::Csv {
            path: path.to_path_buf(),
            source: error,
        },
        _ => EvalError::MalformedRow {
            path: path.to_path_buf(),
            line: error.position().map_or(0, |p| p.line()),
            reason: error.to_string(),
        },
    }
}
