use aerodesk_core::config::{AppConfig, LlmProvider, LoadOptions};
use aerodesk_db::connect_with_settings;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_model_provider(&config));
            checks.push(check_web_search(&config));
            checks.push(check_database_connectivity(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["model_provider_readiness", "web_search_readiness", "database_connectivity"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status != CheckStatus::Fail)
        && checks.first().is_some_and(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_model_provider(config: &AppConfig) -> DoctorCheck {
    let llm = &config.llm;
    let endpoint = match (llm.provider, llm.base_url.as_deref()) {
        (_, Some(url)) => url.to_string(),
        (LlmProvider::OpenAi, None) => "https://api.openai.com/v1".to_string(),
        (LlmProvider::Cohere, None) => "https://api.cohere.com/v2".to_string(),
        (LlmProvider::Ollama, None) => {
            return DoctorCheck {
                name: "model_provider_readiness",
                status: CheckStatus::Fail,
                details: "ollama requires llm.base_url".to_string(),
            };
        }
    };

    DoctorCheck {
        name: "model_provider_readiness",
        status: CheckStatus::Pass,
        details: format!(
            "{} chat model `{}` and embedding model `{}` at {endpoint}",
            llm.provider.as_str(),
            llm.model,
            llm.embedding_model
        ),
    }
}

fn check_web_search(config: &AppConfig) -> DoctorCheck {
    if config.search.api_key.is_some() {
        DoctorCheck {
            name: "web_search_readiness",
            status: CheckStatus::Pass,
            details: format!(
                "tavily at {} (max {} results)",
                config.search.base_url, config.search.max_results
            ),
        }
    } else {
        DoctorCheck {
            name: "web_search_readiness",
            status: CheckStatus::Skipped,
            details: "no search.api_key; web search calls will report an error to the model"
                .to_string(),
        }
    }
}

fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

        pool.close().await;
        Ok::<(), String>(())
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        },
        Err(error) => {
            DoctorCheck { name: "database_connectivity", status: CheckStatus::Fail, details: error }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::{render_human, CheckStatus, DoctorCheck, DoctorReport};

    #[test]
    fn human_report_marks_each_check() {
        let report = DoctorReport {
            overall_status: CheckStatus::Pass,
            summary: "doctor: all readiness checks passed".to_string(),
            checks: vec![
                DoctorCheck {
                    name: "config_validation",
                    status: CheckStatus::Pass,
                    details: "configuration loaded and validated".to_string(),
                },
                DoctorCheck {
                    name: "web_search_readiness",
                    status: CheckStatus::Skipped,
                    details: "no search.api_key".to_string(),
                },
            ],
        };

        let rendered = render_human(&report);
        assert!(rendered.contains("- [ok] config_validation"));
        assert!(rendered.contains("- [skip] web_search_readiness: no search.api_key"));
    }
}
