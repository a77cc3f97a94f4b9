// src/publish/naming.rs

//! Image names for MLflow model folders.
//!
//! Layout of a folder as written by the tracking server:
//! `/mlartifacts/<experiment_id>/<run_id>/artifacts/model`.
//! The resulting image is
//! `<namespace>/mlflow-model-<exp>-<run>-<YYYYMMDD>`, all lowercase.

use std::path::{Component, Path};

use chrono::{Local, NaiveDate};

use crate::publish::Namer;

const UNKNOWN_EXPERIMENT: &str = "unknown-experiment";
const UNKNOWN_RUN: &str = "unknown-run";

/// Where the date stamp in the image name comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    /// Local date at the moment the name is derived.
    Today,
    /// A fixed date, for reproducible names.
    Fixed(NaiveDate),
}

impl DateSource {
    fn stamp(&self) -> String {
        let date = match self {
            DateSource::Today => Local::now().date_naive(),
            DateSource::Fixed(date) => *date,
        };
        date.format("%Y%m%d").to_string()
    }
}

#[derive(Debug, Clone)]
pub struct MlflowNamer {
    namespace: String,
    ancestor_segment: String,
    date: DateSource,
}

impl MlflowNamer {
    pub fn new(namespace: impl Into<String>, ancestor_segment: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ancestor_segment: ancestor_segment.into(),
            date: DateSource::Today,
        }
    }

    pub fn with_date(mut self, date: DateSource) -> Self {
        self.date = date;
        self
    }

    /// Components strictly between the last ancestor segment and the leaf.
    fn run_components<'a>(&self, path: &'a Path) -> Vec<&'a str> {
        let names: Vec<&str> = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => name.to_str(),
                _ => None,
            })
            .collect();

        let Some((_, before_leaf)) = names.split_last() else {
            return Vec::new();
        };

        match before_leaf
            .iter()
            .rposition(|name| *name == self.ancestor_segment)
        {
            Some(idx) => before_leaf[idx + 1..].to_vec(),
            None => Vec::new(),
        }
    }
}

impl Namer for MlflowNamer {
    fn derive_image_name(&self, path: &Path) -> String {
        let parts = self.run_components(path);
        let experiment = parts
            .first()
            .map(|s| shorten(s))
            .unwrap_or_else(|| UNKNOWN_EXPERIMENT.to_string());
        let run = parts
            .get(1)
            .map(|s| shorten(s))
            .unwrap_or_else(|| UNKNOWN_RUN.to_string());

        let name = format!(
            "{}/mlflow-model-{}-{}-{}",
            self.namespace,
            sanitize(&experiment),
            sanitize(&run),
            self.date.stamp()
        );
        name.to_lowercase()
    }
}

/// `first4-last4` for ids longer than 8 characters.
fn shorten(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= 8 {
        return id.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}-{tail}")
}

/// Keep only characters valid in an image path component.
fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect()
}
