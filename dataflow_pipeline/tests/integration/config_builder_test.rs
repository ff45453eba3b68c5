// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Configuration Builder Tests
//!
//! Document-to-pipe construction: registry resolution, model loading with
//! secret tokens, capability checking, and running a fully
//! document-defined pipe end to end.

use std::io::Write as _;
use std::sync::Arc;

use dataflow_pipeline::{
    field, GlobalDocument, InlineOperation, ModelCapability, Namespace, Operation, OperationRegistry, PipeBuilder,
    PipeCatalog, PipeDocument, PipeRunner, PipelineError, TypeDescriptor, Value,
};

const ARTICLE_PIPE: &str = r#"
name: article
stages:
  - name: shape
    mode: merge
    operations:
      - type: link
        options:
          copy: { from: body, to: draft }
          set: { revision: 1 }
      - type: log
        options:
          label: intake
          fields: [tags]
  - name: split
    mode: batch
    operations:
      - type: explode
        options: { source: tags, target: tag }
  - name: keep
    mode: batch
    operations:
      - type: filter
        options: { field: tag, equals: "keep" }
  - name: gather
    mode: merge
    operations:
      - type: collapse
        options: { source: tag, target: kept, strategy: collect }
"#;

fn builder() -> PipeBuilder {
    PipeBuilder::new(OperationRegistry::with_builtins())
}

/// Tests building and running a document-defined pipe.
/// Validates that:
/// - All four built-in shapes wire together from YAML options
/// - The pipe executes with the documented semantics
#[tokio::test]
async fn test_document_pipe_end_to_end() {
    let document = PipeDocument::from_yaml_str(ARTICLE_PIPE).unwrap();
    let pipe = builder().build(&document).unwrap();

    let input = Namespace::from_pairs([
        ("body", Value::text("text")),
        (
            "tags",
            Value::list([Value::text("keep"), Value::text("drop"), Value::text("keep")]),
        ),
    ]);
    let output = PipeRunner::new().run(&pipe, input).await.unwrap();

    assert_eq!(output.get(&field("draft")), Some(&Value::text("text")));
    assert_eq!(output.get(&field("revision")), Some(&Value::int(1)));
    assert_eq!(
        output.get(&field("kept")),
        Some(&Value::list([Value::text("keep"), Value::text("keep")]))
    );
}

/// Tests unknown operation ids.
/// Validates that:
/// - A document naming an unregistered operation raises MissingOperation
#[test]
fn test_unknown_operation() {
    let yaml = r#"
name: p
stages:
  - name: s
    mode: merge
    operations:
      - type: summarize
"#;
    let document = PipeDocument::from_yaml_str(yaml).unwrap();
    let err = builder().build(&document).unwrap_err();
    assert!(matches!(err, PipelineError::MissingOperation(_)));
}

// Registry with one model-backed operation next to the built-ins.
fn summarize_registry() -> OperationRegistry {
    let mut registry = OperationRegistry::with_builtins();
    registry.register("summarize", |spec: &dataflow_pipeline::OperationSpec<'_>| {
        let mut op = InlineOperation::builder("summarize")
            .reads("body", TypeDescriptor::text())
            .sets("summary", TypeDescriptor::text())
            .requires_capability(ModelCapability::TextToText);
        if let Some(model) = spec.model {
            op = op.model(model.clone());
        }
        Ok(Arc::new(op.map(|_| Ok([(field("summary"), Value::text("…"))].into()))) as Arc<dyn Operation>)
    });
    registry
}

/// Tests model resolution and capability checking.
/// Validates that:
/// - A document naming an unloaded model raises MissingModel
/// - A model without the required capability raises CapabilityMismatch
/// - A capable model builds successfully
#[test]
fn test_model_resolution_and_capabilities() {
    let pipe_yaml = r#"
name: p
stages:
  - name: s
    mode: merge
    operations:
      - type: summarize
        model: writer
"#;
    let document = PipeDocument::from_yaml_str(pipe_yaml).unwrap();

    // No models loaded at all.
    let err = PipeBuilder::new(summarize_registry()).build(&document).unwrap_err();
    assert!(matches!(err, PipelineError::MissingModel(_)));

    let mut wrong_builder = PipeBuilder::new(summarize_registry());
    let wrong_global = GlobalDocument::from_yaml_str(
        r#"
models:
  writer:
    provider: acme
    model: acme-paint-1
    capabilities: [text_to_image]
"#,
    )
    .unwrap();
    wrong_builder.load_models(&wrong_global).unwrap();
    let err = wrong_builder.build(&document).unwrap_err();
    assert!(matches!(err, PipelineError::CapabilityMismatch(_)));

    let mut good_builder = PipeBuilder::new(summarize_registry());
    let good_global = GlobalDocument::from_yaml_str(
        r#"
models:
  writer:
    provider: acme
    model: acme-large-1
    capabilities: [text_to_text]
"#,
    )
    .unwrap();
    good_builder.load_models(&good_global).unwrap();
    assert!(good_builder.build(&document).is_ok());
}

/// Tests missing model names.
/// Validates that:
/// - An operation referencing an unloaded model raises MissingModel
#[test]
fn test_missing_model_reference() {
    let yaml = r#"
name: p
stages:
  - name: s
    mode: merge
    operations:
      - type: log
        model: phantom
"#;
    let document = PipeDocument::from_yaml_str(yaml).unwrap();
    let err = builder().build(&document).unwrap_err();
    assert!(matches!(err, PipelineError::MissingModel(_)));
}

/// Tests secret token resolution during model loading.
/// Validates that:
/// - `${ENV}` tokens resolve from the environment
/// - `secret://` tokens resolve through the configured resolver
/// - An unknown capability id fails the load
#[test]
fn test_model_loading_with_secrets() {
    std::env::set_var("CONFIG_BUILDER_TEST_KEY", "k-env");

    let global = GlobalDocument::from_yaml_str(
        r#"
models:
  writer:
    provider: acme
    model: acme-large-1
    capabilities: [text_to_text]
    options:
      api_key: "${CONFIG_BUILDER_TEST_KEY}"
      signing_key: "secret://signing"
      region: us-east
"#,
    )
    .unwrap();

    let resolver = |reference: &str| (reference == "signing").then(|| "k-secret".to_string());
    let mut builder = PipeBuilder::new(OperationRegistry::with_builtins()).with_secret_resolver(Arc::new(resolver));
    builder.load_models(&global).unwrap();

    let writer = builder.models().get("writer").unwrap();
    assert_eq!(writer.option("api_key"), Some(&Value::text("k-env")));
    assert_eq!(writer.option("signing_key"), Some(&Value::text("k-secret")));
    assert_eq!(writer.option("region"), Some(&Value::text("us-east")));

    let bad_capability = GlobalDocument::from_yaml_str(
        r#"
models:
  writer:
    provider: acme
    model: acme-large-1
    capabilities: [text_to_everything]
"#,
    )
    .unwrap();
    let mut builder = PipeBuilder::new(OperationRegistry::with_builtins());
    assert!(matches!(
        builder.load_models(&bad_capability),
        Err(PipelineError::InvalidDocument(_))
    ));
}

/// Tests file loading and the pipe catalog.
/// Validates that:
/// - Documents load from disk
/// - The catalog resolves by name and raises MissingPipe otherwise
#[tokio::test]
async fn test_file_loading_and_catalog() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(ARTICLE_PIPE.as_bytes()).unwrap();

    let document = PipeDocument::from_yaml_file(file.path()).unwrap();
    let pipe = builder().build(&document).unwrap();

    let mut catalog = PipeCatalog::new();
    catalog.insert(pipe);

    assert!(catalog.get("article").is_ok());
    assert!(matches!(catalog.get("nope"), Err(PipelineError::MissingPipe(_))));
}
