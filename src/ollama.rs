use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Stop sequence for llama3-family chat templates.
pub const STOP_TOKEN: &str = "<|eot_id|>";

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

/// Per-request generation options, passed through to the runtime verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateOptions {
    num_predict: u32,
    frequency_penalty: f32,
    stop: Vec<String>,
}

impl GenerateOptions {
    pub fn new(num_predict: u32, frequency_penalty: f32) -> Self {
        Self {
            num_predict,
            frequency_penalty,
            stop: vec![STOP_TOKEN.to_string()],
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<ModelTag>,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// One completion call: prompt in, generated text out. Any transport or
    /// runtime failure propagates to the caller untouched.
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: GenerateOptions,
    ) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
            stream: false,
            options,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Ollama request failed with status: {}. Make sure Ollama is running with: ollama serve",
                response.status()
            ));
        }

        let generate_response: GenerateResponse = response.json().await?;
        Ok(generate_response.response)
    }

    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to list models: {}", response.status()));
        }

        let tags_response: TagsResponse = response.json().await?;
        let model_names: Vec<String> = tags_response
            .models
            .into_iter()
            .map(|model| model.name)
            .collect();

        Ok(model_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_serialize_with_stop_sequence() {
        let options = GenerateOptions::new(150, 0.2);
        let json = serde_json::to_value(&options).unwrap();

        assert_eq!(json["num_predict"], 150);
        assert_eq!(json["stop"][0], STOP_TOKEN);
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/");
        assert_eq!(client.base_url, "http://localhost:11434");
    }
}
