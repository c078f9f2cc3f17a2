use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;

use linear_ops::auth::{CallbackServer, Credential, LinearAuth};
use linear_ops::client::{
    IssueCreateInput, IssueUpdateInput, OperationExecutor, ProjectCreateInput, WorkflowManager,
    ISSUE_SEARCH, PROJECT_CREATE, TEAMS, VIEWER,
};
use linear_ops::config::EnvManager;
use linear_ops::error::WorkflowError;

/// Linear CLI - Interface de linha de comando para a API GraphQL do Linear
#[derive(Parser)]
#[command(name = "linear")]
#[command(author = "eLai Integration Team")]
#[command(version = "0.1.0")]
#[command(about = "CLI para workflows na API do Linear", long_about = None)]
struct Cli {
    /// Formato de saída (json, pretty)
    #[arg(short = 'o', long, default_value = "pretty", global = true)]
    output: OutputFormat,

    /// Modo verbose para debug
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Comando a executar
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, PartialEq)]
enum OutputFormat {
    Json,
    Pretty,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "pretty" => Ok(OutputFormat::Pretty),
            _ => Err(format!("Formato desconhecido: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Autentica via OAuth2 e salva os tokens no .env
    Auth {
        /// Força reautenticação mesmo se já houver token
        #[arg(short = 'f', long)]
        force: bool,
    },

    /// Remove os tokens OAuth2 salvos
    Logout,

    /// Mostra o usuário autenticado
    Viewer,

    /// Lista os teams do workspace
    Teams,

    /// Pesquisa issues por texto
    Search {
        /// Texto a pesquisar
        #[arg(short = 't', long)]
        term: String,

        /// Quantidade máxima de resultados
        #[arg(short = 'n', long, default_value = "10")]
        first: u32,
    },

    /// Cria um projeto
    CreateProject {
        /// Nome do projeto
        #[arg(short = 'n', long)]
        name: String,

        /// IDs dos teams (separados por vírgula)
        #[arg(short = 't', long)]
        team_ids: String,

        /// Descrição do projeto
        #[arg(short = 'd', long)]
        description: Option<String>,
    },

    /// Cria um projeto e um lote de issues dentro dele
    Plan {
        /// Arquivo JSON com {"project": {...}, "issues": [...]}
        #[arg(short = 'f', long, conflicts_with_all = ["name", "team_id", "issues"])]
        file: Option<PathBuf>,

        /// Nome do projeto
        #[arg(short = 'n', long)]
        name: Option<String>,

        /// ID do team do projeto e das issues
        #[arg(short = 't', long)]
        team_id: Option<String>,

        /// Títulos das issues (separados por vírgula)
        #[arg(short = 'i', long)]
        issues: Option<String>,

        /// Descrição do projeto
        #[arg(short = 'd', long)]
        description: Option<String>,
    },

    /// Cria um lote de issues em uma única chamada
    CreateIssues {
        /// Arquivo JSON com uma lista de issues
        #[arg(short = 'f', long, conflicts_with_all = ["team_id", "titles"])]
        file: Option<PathBuf>,

        /// ID do team das issues
        #[arg(short = 't', long)]
        team_id: Option<String>,

        /// Títulos das issues (separados por vírgula)
        #[arg(long)]
        titles: Option<String>,
    },

    /// Aplica o mesmo update a um lote de issues
    UpdateIssues {
        /// IDs das issues (separados por vírgula)
        #[arg(short = 'i', long)]
        ids: String,

        /// Nova descrição
        #[arg(short = 'd', long)]
        description: Option<String>,

        /// Nova prioridade (0=none, 1=urgent, 2=high, 3=normal, 4=low)
        #[arg(short = 'p', long)]
        priority: Option<u8>,

        /// ID do novo estado do workflow
        #[arg(short = 's', long)]
        state_id: Option<String>,

        /// ID do novo responsável
        #[arg(short = 'a', long)]
        assignee_id: Option<String>,
    },

    /// Move um lote de issues para a lixeira
    DeleteIssues {
        /// IDs das issues (separados por vírgula)
        #[arg(short = 'i', long)]
        ids: String,
    },
}

/// Plano de projeto lido de arquivo JSON
#[derive(serde::Deserialize)]
struct ProjectPlan {
    project: ProjectCreateInput,
    issues: Vec<IssueCreateInput>,
}

/// Estrutura para resposta padronizada
#[derive(serde::Serialize)]
struct CliResponse {
    success: bool,
    data: Option<serde_json::Value>,
    error: Option<String>,
}

impl CliResponse {
    fn success(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(msg: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg),
        }
    }

    /// Falha de workflow com passos já concluídos anexados em `data`
    fn partial_failure(error: &WorkflowError) -> Self {
        let data = if error.completed.is_empty() {
            None
        } else {
            Some(json!({ "completed": error.completed }))
        };
        Self {
            success: false,
            data,
            error: Some(error.to_string()),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Configura logging
    let default_level = if cli.verbose { "debug" } else { "error" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let output_format = cli.output.clone();

    match execute_command(&cli).await {
        Ok(response) => {
            let exit_code = if response.success { 0 } else { 1 };
            output_response(response, &output_format);
            std::process::exit(exit_code);
        }
        Err(e) => {
            eprintln!("❌ Erro: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn execute_command(cli: &Cli) -> Result<CliResponse> {
    match &cli.command {
        Commands::Auth { force } => handle_auth(*force).await,

        Commands::Logout => {
            EnvManager::clear_token_state()?;
            Ok(CliResponse::success(json!({
                "message": "Tokens removidos do .env"
            })))
        }

        Commands::Viewer => {
            let auth = authenticated_auth().await?;
            let client = auth.client().await?;

            match OperationExecutor::new(&client).run(&VIEWER, json!({})).await {
                Ok(viewer) => Ok(CliResponse::success(viewer)),
                Err(e) => Ok(CliResponse::error(e.to_string())),
            }
        }

        Commands::Teams => {
            let auth = authenticated_auth().await?;
            let client = auth.client().await?;

            match OperationExecutor::new(&client).run(&TEAMS, json!({})).await {
                Ok(teams) => Ok(CliResponse::success(teams)),
                Err(e) => Ok(CliResponse::error(e.to_string())),
            }
        }

        Commands::Search { term, first } => {
            let auth = authenticated_auth().await?;
            let client = auth.client().await?;

            let variables = json!({ "term": term, "first": first });
            match OperationExecutor::new(&client).run(&ISSUE_SEARCH, variables).await {
                Ok(results) => Ok(CliResponse::success(results)),
                Err(e) => Ok(CliResponse::error(e.to_string())),
            }
        }

        Commands::CreateProject {
            name,
            team_ids,
            description,
        } => {
            let auth = authenticated_auth().await?;
            let client = auth.client().await?;

            let mut input = ProjectCreateInput::new(name.clone(), parse_id_list(team_ids));
            input.description = description.clone();
            let variables = json!({ "input": serde_json::to_value(&input)? });

            match OperationExecutor::new(&client).run(&PROJECT_CREATE, variables).await {
                Ok(payload) => Ok(CliResponse::success(payload)),
                Err(e) => Ok(CliResponse::error(e.to_string())),
            }
        }

        Commands::Plan {
            file,
            name,
            team_id,
            issues,
            description,
        } => {
            let (project, issue_inputs) = match file {
                Some(path) => {
                    let contents = std::fs::read_to_string(path)
                        .with_context(|| format!("falha ao ler {}", path.display()))?;
                    let plan: ProjectPlan = serde_json::from_str(&contents)
                        .with_context(|| format!("JSON inválido em {}", path.display()))?;
                    (plan.project, plan.issues)
                }
                None => {
                    let name = name
                        .clone()
                        .ok_or_else(|| anyhow!("Forneça --file ou --name"))?;
                    let team_id = team_id
                        .clone()
                        .ok_or_else(|| anyhow!("Forneça --team-id junto com --name"))?;
                    let titles = issues
                        .clone()
                        .ok_or_else(|| anyhow!("Forneça --issues junto com --name"))?;

                    let mut project = ProjectCreateInput::new(name, vec![team_id.clone()]);
                    project.description = description.clone();
                    let issue_inputs = parse_id_list(&titles)
                        .into_iter()
                        .map(|title| IssueCreateInput::new(title, team_id.clone()))
                        .collect();
                    (project, issue_inputs)
                }
            };

            let auth = authenticated_auth().await?;
            let manager = WorkflowManager::new(auth.client().await?);

            match manager.create_project_with_issues(project, issue_inputs).await {
                Ok(outcome) => Ok(CliResponse::success(json!({
                    "project_id": outcome.project_id(),
                    "steps": outcome.steps,
                }))),
                Err(e) => Ok(CliResponse::partial_failure(&e)),
            }
        }

        Commands::CreateIssues {
            file,
            team_id,
            titles,
        } => {
            let issue_inputs: Vec<IssueCreateInput> = match file {
                Some(path) => {
                    let contents = std::fs::read_to_string(path)
                        .with_context(|| format!("falha ao ler {}", path.display()))?;
                    serde_json::from_str(&contents)
                        .with_context(|| format!("JSON inválido em {}", path.display()))?
                }
                None => {
                    let team_id = team_id
                        .clone()
                        .ok_or_else(|| anyhow!("Forneça --file ou --team-id"))?;
                    let titles = titles
                        .clone()
                        .ok_or_else(|| anyhow!("Forneça --titles junto com --team-id"))?;
                    parse_id_list(&titles)
                        .into_iter()
                        .map(|title| IssueCreateInput::new(title, team_id.clone()))
                        .collect()
                }
            };

            let auth = authenticated_auth().await?;
            let manager = WorkflowManager::new(auth.client().await?);

            match manager.create_issues(issue_inputs).await {
                Ok(payload) => Ok(CliResponse::success(payload)),
                Err(e) => Ok(CliResponse::error(e.to_string())),
            }
        }

        Commands::UpdateIssues {
            ids,
            description,
            priority,
            state_id,
            assignee_id,
        } => {
            let input = IssueUpdateInput {
                description: description.clone(),
                priority: *priority,
                state_id: state_id.clone(),
                assignee_id: assignee_id.clone(),
                ..Default::default()
            };

            let auth = authenticated_auth().await?;
            let manager = WorkflowManager::new(auth.client().await?);

            match manager.update_issues(&parse_id_list(ids), input).await {
                Ok(payload) => Ok(CliResponse::success(payload)),
                Err(e) => Ok(CliResponse::error(e.to_string())),
            }
        }

        Commands::DeleteIssues { ids } => {
            let auth = authenticated_auth().await?;
            let manager = WorkflowManager::new(auth.client().await?);

            match manager.delete_issues(&parse_id_list(ids)).await {
                Ok(payload) => Ok(CliResponse::success(payload)),
                Err(e) => Ok(CliResponse::error(e.to_string())),
            }
        }
    }
}

/// Carrega credenciais do ambiente e entrega um `LinearAuth` pronto para
/// uso, renovando e persistindo tokens expirados quando necessário
async fn authenticated_auth() -> Result<LinearAuth> {
    let env = EnvManager::load()?;
    let credential = EnvManager::credential()
        .context("credenciais ausentes; defina LINEAR_API_KEY ou LINEAR_CLIENT_ID/LINEAR_CLIENT_SECRET")?;
    let is_oauth = matches!(credential, Credential::OAuth(_));

    let mut auth = LinearAuth::with_endpoints(env.endpoints.clone());
    auth.initialize(credential)?;

    if is_oauth {
        if let Some(state) = EnvManager::load_token_state() {
            auth.restore_tokens(state).await?;
        }

        if auth.needs_refresh().await {
            tracing::info!("access token expired, refreshing");
            auth.refresh()
                .await
                .context("falha ao renovar o token; rode 'linear auth' novamente")?;
            if let Some(state) = auth.token_state().await {
                EnvManager::save_token_state(&state)?;
            }
        }
    }

    if !auth.is_authenticated().await {
        return Err(anyhow!(
            "Não autenticado. Rode 'linear auth' ou defina LINEAR_API_KEY"
        ));
    }

    Ok(auth)
}

async fn handle_auth(force: bool) -> Result<CliResponse> {
    let env = EnvManager::load()?;
    EnvManager::create_env_file_if_not_exists()?;

    let credential = EnvManager::credential()
        .context("defina LINEAR_CLIENT_ID e LINEAR_CLIENT_SECRET no .env")?;
    if matches!(credential, Credential::ApiKey { .. }) {
        return Ok(CliResponse::success(json!({
            "message": "LINEAR_API_KEY definida; o fluxo OAuth2 não é necessário"
        })));
    }

    let mut auth = LinearAuth::with_endpoints(env.endpoints.clone());
    auth.initialize(credential)?;

    if !force {
        if let Some(state) = EnvManager::load_token_state() {
            if auth.restore_tokens(state).await.is_ok() && auth.is_authenticated().await {
                return Ok(CliResponse::success(json!({
                    "message": "Já autenticado. Use --force para reautenticar"
                })));
            }
        }
    }

    let (url, state) = auth.authorization_url()?;

    println!("🔐 Iniciando fluxo de autenticação OAuth2...");

    // O servidor sobe antes do navegador: o redirect não pode encontrar a
    // porta fechada, e porta ocupada falha antes da tela de consentimento
    let server = CallbackServer::new(env.callback_port, state).start()?;

    println!("📌 Um navegador será aberto para você autorizar o acesso.");
    if webbrowser::open(&url).is_err() {
        println!("🌐 Abra manualmente: {}", url);
    }

    let callback = server.wait().await?;
    auth.exchange_code(&callback.code).await?;

    let tokens = auth
        .token_state()
        .await
        .ok_or_else(|| anyhow!("troca de código não produziu tokens"))?;
    EnvManager::save_token_state(&tokens)?;

    Ok(CliResponse::success(json!({
        "message": "Autenticação concluída com sucesso!",
        "token_preview": token_preview(&tokens.access_token),
        "note": "Tokens salvos no .env"
    })))
}

/// Quebra uma lista separada por vírgulas, descartando entradas vazias
fn parse_id_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Começo e fim do token para exibição; fatiado por caracteres, nunca por
/// bytes, para não partir um caractere multi-byte ao meio
fn token_preview(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "****".to_string()
    }
}

fn output_response(response: CliResponse, format: &OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(&response).unwrap());
        }
        OutputFormat::Pretty => {
            if response.success {
                if let Some(data) = response.data {
                    println!("✅ Sucesso!");
                    println!("{}", serde_json::to_string_pretty(&data).unwrap());
                }
            } else {
                if let Some(error) = response.error {
                    eprintln!("❌ Erro: {}", error);
                }
                if let Some(data) = response.data {
                    eprintln!("⚠️  Passos já concluídos (sem rollback):");
                    eprintln!("{}", serde_json::to_string_pretty(&data).unwrap());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_token_preview_masks_middle() {
        assert_eq!(token_preview("lin_oauth_abcdef1234"), "lin_...1234");
    }

    #[test]
    fn test_token_preview_short_token_fully_masked() {
        assert_eq!(token_preview("curto"), "****");
        assert_eq!(token_preview(""), "****");
    }

    #[test]
    fn test_token_preview_multibyte_token() {
        // Caracteres de 3 bytes: um corte por bytes cairia no meio deles
        assert_eq!(token_preview("€€€€€€€€€"), "€€€€...€€€€");
    }

    #[test]
    fn test_parse_id_list_trims_and_drops_empty() {
        assert_eq!(
            parse_id_list(" iss_1, iss_2 ,,iss_3,"),
            vec!["iss_1".to_string(), "iss_2".to_string(), "iss_3".to_string()]
        );
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "PRETTY".parse::<OutputFormat>().unwrap(),
            OutputFormat::Pretty
        );
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
