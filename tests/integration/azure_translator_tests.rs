/*!
 * Tests for the Azure Document Translation client against a local HTTP server
 */

use anyhow::Result;
use mockito::{Matcher, Server};
use reqwest::Client;

use docbridge::errors::SubmissionError;
use docbridge::translator::azure::AzureDocumentTranslator;
use docbridge::translator::document::BatchRequest;
use docbridge::translator::{DocumentTranslator, submit_job};

fn batches_path() -> Matcher {
    Matcher::Regex(r"^/translator/document/batches(\?.*)?$".to_string())
}

fn translator_for(endpoint: &str) -> AzureDocumentTranslator {
    AzureDocumentTranslator::new(Client::new(), endpoint, "test-subscription-key", "westeurope", "2024-05-01")
}

fn sample_request() -> BatchRequest {
    BatchRequest::single(
        "https://example.com/sourceSASUrl",
        "https://example.com/targetSASUrl",
        Some("en"),
        "fr",
    )
}

#[test]
fn test_batches_url_withTrailingSlash_shouldJoinCleanly() {
    let translator = translator_for("https://example.cognitiveservices.azure.com/");

    assert_eq!(
        translator.batches_url(),
        "https://example.cognitiveservices.azure.com/translator/document/batches?api-version=2024-05-01"
    );
}

/// Test that the batch is posted with the three service headers and the pretty JSON body
#[tokio::test]
async fn test_submit_withAcceptedBatch_shouldReturnReceipt() -> Result<()> {
    let mut server = Server::new_async().await;
    let request = sample_request();
    let mock = server
        .mock("POST", batches_path())
        .match_query(Matcher::UrlEncoded("api-version".into(), "2024-05-01".into()))
        .match_header("Ocp-Apim-Subscription-Key", "test-subscription-key")
        .match_header("Ocp-Apim-Subscription-Region", "westeurope")
        .match_header("Content-Type", "application/json")
        .match_body(request.to_pretty_json()?.as_str())
        .with_status(202)
        .with_header("Operation-Location", "https://example.com/translator/document/batches/42")
        .create_async()
        .await;
    let translator = translator_for(&server.url());

    let receipt = translator.submit(&request).await?;

    assert_eq!(receipt.status_code, 202);
    assert_eq!(
        receipt.operation_location.as_deref(),
        Some("https://example.com/translator/document/batches/42")
    );
    mock.assert_async().await;
    Ok(())
}

/// Test that an auto-detect job omits the source language from the posted body
#[tokio::test]
async fn test_submit_job_withoutSourceLanguage_shouldPostAutoDetectBatch() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", batches_path())
        .match_body(Matcher::PartialJsonString(
            r#"{"inputs":[{"storageType":"File","source":{"sourceUrl":"https://example.com/s"},"targets":[{"targetUrl":"https://example.com/t","language":"de"}]}]}"#
                .to_string(),
        ))
        .with_status(202)
        .create_async()
        .await;
    let translator = translator_for(&server.url());

    let receipt = submit_job(&translator, "https://example.com/s", "https://example.com/t", None, "de").await?;

    assert_eq!(receipt.operation_location, None);
    mock.assert_async().await;
    Ok(())
}

/// Test that a non-2xx answer is a rejection carrying the response body
#[tokio::test]
async fn test_submit_withUnauthorizedResponse_shouldReturnRejected() -> Result<()> {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", batches_path())
        .with_status(401)
        .with_body(r#"{"error":{"code":"401000","message":"Access denied"}}"#)
        .create_async()
        .await;
    let translator = translator_for(&server.url());

    let err = translator.submit(&sample_request()).await.unwrap_err();

    match err {
        SubmissionError::Rejected { status_code, message } => {
            assert_eq!(status_code, 401);
            assert!(message.contains("Access denied"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_submit_withUnreachableEndpoint_shouldReturnTransportError() {
    let translator = translator_for("http://127.0.0.1:1");

    let err = translator.submit(&sample_request()).await.unwrap_err();

    assert!(matches!(err, SubmissionError::Transport(_)));
}
