//! Sentiment pass over a harvest output file.
//!
//! The model is supplied by the caller through [`SentimentClassifier`]; this
//! crate only walks posts and comment trees and writes the annotated result.

use checkpoint_store::write_json_atomic;
use harvest_core::{CollectedItem, Comment, CoreError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

pub trait SentimentClassifier {
    fn classify(&self, text: &str) -> Sentiment;
}

impl<F> SentimentClassifier for F
where
    F: Fn(&str) -> Sentiment,
{
    fn classify(&self, text: &str) -> Sentiment {
        self(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentSentiment {
    pub body: String,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedPost {
    pub title: String,
    pub body: String,
    pub post_sentiment: Sentiment,
    pub comments: Vec<CommentSentiment>,
}

/// Empty text is neutral without consulting the model.
pub fn rate(classifier: &dyn SentimentClassifier, text: &str) -> Sentiment {
    if text.is_empty() {
        Sentiment::Neutral
    } else {
        classifier.classify(text)
    }
}

/// Every comment in the forest, parents before their replies, siblings in
/// document order. Uses an explicit stack so depth is bounded only by memory.
pub fn flatten_comments(comments: &[Comment]) -> Vec<&Comment> {
    let mut flattened = Vec::new();
    let mut stack: Vec<&Comment> = comments.iter().rev().collect();

    while let Some(comment) = stack.pop() {
        flattened.push(comment);
        stack.extend(comment.replies.iter().rev());
    }
    flattened
}

pub fn analyze_post(classifier: &dyn SentimentClassifier, post: &CollectedItem) -> AnalyzedPost {
    let comments = flatten_comments(&post.comments)
        .into_iter()
        .map(|comment| CommentSentiment {
            body: comment.body.clone(),
            sentiment: rate(classifier, &comment.body),
        })
        .collect();

    AnalyzedPost {
        title: post.title.clone(),
        body: post.body.clone(),
        post_sentiment: rate(classifier, &post.body),
        comments,
    }
}

pub fn analyze_posts(
    classifier: &dyn SentimentClassifier,
    posts: &[CollectedItem],
) -> Vec<AnalyzedPost> {
    posts
        .iter()
        .map(|post| analyze_post(classifier, post))
        .collect()
}

/// `{subreddit}_posts_sentiment.json`
pub fn analysis_path(dir: &Path, subreddit: &str) -> PathBuf {
    dir.join(format!("{}_posts_sentiment.json", subreddit))
}

/// Read a harvest output, annotate it, and write the analysis file.
pub async fn analyze_file(
    classifier: &dyn SentimentClassifier,
    input: &Path,
    output: &Path,
) -> Result<Vec<AnalyzedPost>, CoreError> {
    debug!("Reading posts from {}", input.display());
    let raw = tokio::fs::read_to_string(input).await?;
    let posts: Vec<CollectedItem> = serde_json::from_str(&raw)?;

    let analyzed = analyze_posts(classifier, &posts);
    write_json_atomic(output, &analyzed).await?;
    info!(
        "Sentiment analysis complete. Results saved to {}",
        output.display()
    );
    Ok(analyzed)
}
