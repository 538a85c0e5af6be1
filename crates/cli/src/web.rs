//! Workflow creation form server.
//!
//! `GET /` serves the form, `POST /post` turns a submission into a workflow
//! description, saves it as `<WorkflowName>.json` and builds it, and
//! `GET /quit` shuts the server down gracefully.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};
use tric::model::{size_in_bytes, ConfigError, ContainerConfig, WorkflowConfig};
use tric::Tric;

const FORM_PAGE: &str = include_str!("../assets/form.html");
const REVIEW_PAGE: &str = include_str!("../assets/review.html");

/// One input container row of the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRow {
    pub name: String,
    pub in_path: String,
    pub size: String,
    pub size_unit: String,
}

/// Raw fields of one form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSubmission {
    pub workflow_name: String,
    pub application_name: String,
    pub application_path: String,
    pub inputs: Vec<InputRow>,
    pub output_name: String,
    pub output_size: String,
    pub output_size_unit: String,
}

impl FormSubmission {
    /// Collect fields by name. Repeated input fields are matched by position.
    pub fn from_fields(fields: &[(String, String)]) -> Result<Self, ConfigError> {
        let all = |key: &str| -> Vec<String> {
            fields
                .iter()
                .filter(|(k, _)| k == key)
                .map(|(_, v)| v.trim().to_string())
                .collect()
        };
        let one = |key: &str, what: &'static str| -> Result<String, ConfigError> {
            all(key)
                .into_iter()
                .next()
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Form(what))
        };

        let names = all("inputContainer.name");
        let paths = all("inputContainer.inPath");
        let sizes = all("inputContainer.size");
        let units = all("inputContainer.sizeUnit");
        if paths.len() != names.len() || sizes.len() != names.len() || units.len() != names.len() {
            return Err(ConfigError::Form("input containers"));
        }
        let inputs = names
            .into_iter()
            .zip(paths)
            .zip(sizes.into_iter().zip(units))
            .map(|((name, in_path), (size, size_unit))| InputRow {
                name,
                in_path,
                size,
                size_unit,
            })
            .collect();

        Ok(Self {
            workflow_name: one("workflowName", "workflow name")?,
            application_name: one("applicationContainer.name", "application container name")?,
            application_path: one("applicationContainer.inPath", "application input path")?,
            inputs,
            output_name: one("outputContainer.name", "output container name")?,
            output_size: one("outputContainer.size", "output container")?,
            output_size_unit: one("outputContainer.sizeUnit", "output container")?,
        })
    }

    /// Convert to a validated workflow description.
    pub fn into_workflow(self) -> Result<WorkflowConfig, ConfigError> {
        let mut inputs = Vec::with_capacity(self.inputs.len());
        for row in self.inputs {
            let size = parse_size(&row.size, &row.size_unit, "input containers")?;
            let mut input = ContainerConfig::new(row.name).with_size(size);
            if !row.in_path.is_empty() {
                input = input.with_source(row.in_path);
            }
            inputs.push(input);
        }
        let output_size = parse_size(&self.output_size, &self.output_size_unit, "output container")?;

        let workflow = WorkflowConfig {
            name: self.workflow_name,
            application: ContainerConfig::new(self.application_name)
                .with_source(self.application_path),
            inputs,
            output: ContainerConfig::new(self.output_name).with_size(output_size),
        };
        workflow.validate()?;
        Ok(workflow)
    }
}

fn parse_size(value: &str, unit: &str, what: &'static str) -> Result<u64, ConfigError> {
    let value: u64 = value.parse().map_err(|_| ConfigError::Form(what))?;
    let unit: u32 = unit.parse().map_err(|_| ConfigError::Form(what))?;
    size_in_bytes(value, unit)
}

#[derive(Clone)]
struct AppState {
    tric: Arc<Tric>,
    description_dir: PathBuf,
    quit: mpsc::Sender<()>,
}

/// The form server. Runs until `/quit` is requested.
pub struct FormServer {
    tric: Arc<Tric>,
    description_dir: PathBuf,
}

impl FormServer {
    /// Server building with `tric` and writing descriptions to `description_dir`.
    pub fn new(tric: Tric, description_dir: impl Into<PathBuf>) -> Self {
        Self {
            tric: Arc::new(tric),
            description_dir: description_dir.into(),
        }
    }

    /// Routes, with `/quit` signalling `quit`.
    pub fn router(&self, quit: mpsc::Sender<()>) -> Router {
        let state = AppState {
            tric: Arc::clone(&self.tric),
            description_dir: self.description_dir.clone(),
            quit,
        };
        Router::new()
            .route("/", get(index))
            .route("/post", post(submit))
            .route("/quit", get(quit_server))
            .with_state(state)
    }

    /// Bind the configured address and serve until `/quit`.
    pub async fn serve(self) -> anyhow::Result<()> {
        let listen = &self.tric.settings().web.listen;
        let addr: SocketAddr = listen
            .parse()
            .with_context(|| format!("invalid listen address {listen:?}"))?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;

        let (tx, mut rx) = mpsc::channel(1);
        let app = self.router(tx);
        println!("Navigate to http://{addr} to set up your workflow");
        info!(%addr, "form server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                rx.recv().await;
            })
            .await?;

        info!("form server closed");
        Ok(())
    }
}

async fn index() -> Html<&'static str> {
    Html(FORM_PAGE)
}

async fn submit(
    State(state): State<AppState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> (StatusCode, Html<String>) {
    let workflow = match FormSubmission::from_fields(&fields).and_then(FormSubmission::into_workflow) {
        Ok(workflow) => workflow,
        Err(e) => {
            error!(error = %e, "rejected form submission");
            return (StatusCode::BAD_REQUEST, Html(error_page(&e.to_string())));
        }
    };

    let description = state.description_dir.join(workflow.description_file_name());
    if let Err(e) = workflow.save(&description) {
        error!(error = %e, path = %description.display(), "failed to save description");
        return (StatusCode::INTERNAL_SERVER_ERROR, Html(error_page(&e.to_string())));
    }
    info!(path = %description.display(), "saved workflow description");

    let tric = Arc::clone(&state.tric);
    let to_build = workflow.clone();
    let built = tokio::task::spawn_blocking(move || tric.create(&to_build)).await;
    match built {
        Ok(Ok(_)) => (StatusCode::OK, Html(review_page(&workflow))),
        Ok(Err(e)) => {
            error!(error = %e, workflow = %workflow.name, "workflow build failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Html(error_page(&error_chain(&e))))
        }
        Err(e) => {
            error!(error = %e, "build task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Html(error_page("build task failed")))
        }
    }
}

async fn quit_server(State(state): State<AppState>) -> Html<&'static str> {
    let _ = state.quit.try_send(());
    Html("Server closed")
}

fn error_chain(e: &tric::Error) -> String {
    let mut message = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = std::error::Error::source(cause);
    }
    message
}

fn review_page(workflow: &WorkflowConfig) -> String {
    let mut body = String::new();
    body.push_str(&section(
        "Application container",
        &[
            ("Name", workflow.application.name.clone()),
            ("Path", display_path(&workflow.application)),
        ],
    ));
    for input in &workflow.inputs {
        body.push_str(&section(
            "Input container",
            &[
                ("Name", input.name.clone()),
                ("Path", display_path(input)),
                ("Size", display_size(input)),
            ],
        ));
    }
    body.push_str(&section(
        "Output container",
        &[
            ("Name", workflow.output.name.clone()),
            ("Size", display_size(&workflow.output)),
        ],
    ));
    render("Review", &body)
}

fn error_page(message: &str) -> String {
    let body = format!(
        "    <section class=\"error\"><h2>Workflow not created</h2><p>{}</p></section>\n",
        escape_html(message)
    );
    render("Error", &body)
}

fn render(title: &str, body: &str) -> String {
    REVIEW_PAGE
        .replace("{{title}}", &escape_html(title))
        .replace("{{body}}", body)
}

fn section(title: &str, rows: &[(&str, String)]) -> String {
    let mut out = format!("    <section>\n      <h2>{}</h2>\n", escape_html(title));
    for (label, value) in rows {
        out.push_str(&format!(
            "      <p>{}: {}</p>\n",
            escape_html(label),
            escape_html(value)
        ));
    }
    out.push_str("    </section>\n");
    out
}

fn display_path(container: &ContainerConfig) -> String {
    container
        .source
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

fn display_size(container: &ContainerConfig) -> String {
    container.size.map(|s| format!("{s} bytes")).unwrap_or_default()
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
