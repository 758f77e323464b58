/// Investigation engine driven through the public API with a canned model
use anyhow::Result;
use async_trait::async_trait;
use deepfix::analysis::{ContextBuilder, ScanCache};
use deepfix::config::{Config, ModelConfig};
use deepfix::error::ModelError;
use deepfix::investigation::{
    ActionType, FileOrigin, GeminiClient, InvestigationEngine, ModelClient, Transport,
};
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

struct CannedModel {
    replies: Mutex<Vec<String>>,
}

#[async_trait]
impl ModelClient for CannedModel {
    async fn generate(&self, model: &str, _api_key: &str, _prompt: &str) -> Result<String, ModelError> {
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Err(ModelError::classify(model, "no more replies"));
        }
        Ok(replies.remove(0))
    }
}

#[tokio::test]
async fn test_investigation_with_shared_scan() -> Result<()> {
    let tmp = TempDir::new()?;
    fs::create_dir_all(tmp.path().join("src"))?;
    fs::write(
        tmp.path().join("src/server.js"),
        "const express = require('express');\nconst app = express();\napp.get('/', (req, res) => res.send(undefinedVar));\n",
    )?;
    let log = format!(
        "ReferenceError: undefinedVar is not defined\n    at handler ({}:3:38)\n    at Layer.handle (node_modules/express/lib/router/layer.js:95:5)",
        tmp.path().join("src/server.js").display()
    );

    let config = Config::default();
    let cache = ScanCache::new(config.scanner.max_files);
    let builder = ContextBuilder::with_config(tmp.path(), &config, Some(cache.get(tmp.path())));
    let model = CannedModel {
        replies: Mutex::new(vec![
            r#"{"action_type": "INVESTIGATE", "thought": "handler uses an undefined name", "files_to_read": []}"#.to_string(),
            "```json\n{\"action_type\": \"PATCH\", \"filepath\": \"src/server.js\", \"full_code_block\": \"app.get('/', (req, res) => res.send('ok'));\", \"explanation\": \"undefinedVar was never declared\"}\n```".to_string(),
        ]),
    };
    let transport = Transport::new(model, vec!["k".to_string()], vec!["m".to_string()], 3);
    let engine = InvestigationEngine::new(transport, builder);

    let result = engine.investigate(&log, None).await?;
    assert_eq!(result.action_type, ActionType::Patch);
    assert_eq!(result.filepath.as_deref(), Some("src/server.js"));
    assert_eq!(result.files_read.len(), 1);
    assert_eq!(result.files_read[0].path, "src/server.js");
    assert_eq!(result.files_read[0].origin, FileOrigin::Traceback);
    assert_eq!(cache.len(), 1);

    let json = serde_json::to_value(&result)?;
    assert_eq!(json["action_type"], "PATCH");
    assert_eq!(json["files_read"][0]["origin"], "traceback");
    Ok(())
}

#[test]
fn test_gemini_client_from_default_config() {
    assert!(GeminiClient::from_config(&ModelConfig::default()).is_ok());
}
