use std::env;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::auth::{Credential, TokenState};
use crate::error::{AuthError, AuthResult};

/// Porta padrão do servidor local de callback
pub const DEFAULT_CALLBACK_PORT: u16 = 8585;

/// URLs dos serviços do Linear, com defaults de produção e override por
/// variável de ambiente (útil para apontar os testes a um servidor local)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub api_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authorize_url: "https://linear.app/oauth/authorize".to_string(),
            token_url: "https://api.linear.app/oauth/token".to_string(),
            api_url: "https://api.linear.app/graphql".to_string(),
        }
    }
}

impl Endpoints {
    /// Defaults de produção com overrides de LINEAR_AUTHORIZE_URL,
    /// LINEAR_TOKEN_URL e LINEAR_API_URL quando presentes
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            authorize_url: env::var("LINEAR_AUTHORIZE_URL")
                .unwrap_or(defaults.authorize_url),
            token_url: env::var("LINEAR_TOKEN_URL").unwrap_or(defaults.token_url),
            api_url: env::var("LINEAR_API_URL").unwrap_or(defaults.api_url),
        }
    }
}

/// Gerenciador de variáveis de ambiente do CLI.
///
/// É o colaborador externo que persiste o `TokenState` entre execuções:
/// a estratégia de autenticação nunca toca o disco, quem grava e restaura
/// os tokens no `.env` é este módulo.
#[derive(Debug, Clone)]
pub struct EnvManager {
    pub callback_port: u16,
    pub endpoints: Endpoints,
}

impl EnvManager {
    /// Carrega `.env` (fora de testes) e monta a configuração do processo
    pub fn load() -> AuthResult<Self> {
        if cfg!(not(test)) && Path::new(".env").exists() {
            dotenvy::dotenv()
                .map_err(|e| AuthError::env(format!("failed to load .env: {}", e)))?;
        }

        let callback_port = env::var("LINEAR_CALLBACK_PORT")
            .ok()
            .and_then(|port| port.parse().ok())
            .unwrap_or(DEFAULT_CALLBACK_PORT);

        Ok(Self {
            callback_port,
            endpoints: Endpoints::from_env(),
        })
    }

    /// Monta a credencial a partir do ambiente.
    ///
    /// LINEAR_API_KEY tem precedência; na ausência dela o trio
    /// LINEAR_CLIENT_ID / LINEAR_CLIENT_SECRET / LINEAR_REDIRECT_URI
    /// forma uma credencial OAuth.
    pub fn credential() -> AuthResult<Credential> {
        if let Ok(key) = env::var("LINEAR_API_KEY") {
            if !key.trim().is_empty() {
                return Ok(Credential::api_key(key));
            }
        }

        let client_id = Self::get_env_var("LINEAR_CLIENT_ID")?;
        let client_secret = Self::get_env_var("LINEAR_CLIENT_SECRET")?;
        let redirect_uri = env::var("LINEAR_REDIRECT_URI").unwrap_or_else(|_| {
            format!("http://localhost:{}/callback", DEFAULT_CALLBACK_PORT)
        });

        Ok(Credential::oauth(client_id, client_secret, redirect_uri))
    }

    /// Obtém variável de ambiente obrigatória
    fn get_env_var(key: &str) -> AuthResult<String> {
        env::var(key).map_err(|_| AuthError::env(format!("{} not set", key)))
    }

    /// Restaura o TokenState persistido, se houver
    pub fn load_token_state() -> Option<TokenState> {
        if cfg!(not(test)) && Path::new(".env").exists() {
            dotenvy::dotenv().ok();
        }

        let access_token = env::var("LINEAR_ACCESS_TOKEN")
            .ok()
            .filter(|token| !token.is_empty())?;
        let refresh_token = env::var("LINEAR_REFRESH_TOKEN")
            .ok()
            .filter(|token| !token.is_empty());
        let expires_at = env::var("LINEAR_TOKEN_EXPIRES_AT")
            .ok()
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Some(TokenState::new(access_token, refresh_token, expires_at))
    }

    /// Persiste o TokenState no `.env` (em testes, nas variáveis do processo)
    pub fn save_token_state(state: &TokenState) -> AuthResult<()> {
        let refresh = state.refresh_token.clone().unwrap_or_default();
        let expires = state
            .expires_at
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();

        if cfg!(test) {
            env::set_var("LINEAR_ACCESS_TOKEN", &state.access_token);
            Self::set_or_remove_var("LINEAR_REFRESH_TOKEN", &refresh);
            Self::set_or_remove_var("LINEAR_TOKEN_EXPIRES_AT", &expires);
            return Ok(());
        }

        Self::update_env_file("LINEAR_ACCESS_TOKEN", &state.access_token)?;
        Self::update_env_file("LINEAR_REFRESH_TOKEN", &refresh)?;
        Self::update_env_file("LINEAR_TOKEN_EXPIRES_AT", &expires)?;
        tracing::info!("Token state persisted to .env");
        Ok(())
    }

    /// Remove o TokenState persistido
    pub fn clear_token_state() -> AuthResult<()> {
        if cfg!(test) {
            env::remove_var("LINEAR_ACCESS_TOKEN");
            env::remove_var("LINEAR_REFRESH_TOKEN");
            env::remove_var("LINEAR_TOKEN_EXPIRES_AT");
            return Ok(());
        }

        Self::update_env_file("LINEAR_ACCESS_TOKEN", "")?;
        Self::update_env_file("LINEAR_REFRESH_TOKEN", "")?;
        Self::update_env_file("LINEAR_TOKEN_EXPIRES_AT", "")?;
        tracing::info!("Token state removed from .env");
        Ok(())
    }

    fn set_or_remove_var(key: &str, value: &str) {
        if value.is_empty() {
            env::remove_var(key);
        } else {
            env::set_var(key, value);
        }
    }

    /// Atualiza uma variável no arquivo `.env`, preservando as demais
    /// linhas; valor vazio remove a linha
    fn update_env_file(key: &str, value: &str) -> AuthResult<()> {
        let env_path = ".env";

        let mut lines = Vec::new();
        let mut key_found = false;

        if let Ok(file) = std::fs::File::open(env_path) {
            let reader = BufReader::new(file);
            for line in reader.lines() {
                let line = line?;
                if line.starts_with(&format!("{}=", key)) {
                    if !value.is_empty() {
                        lines.push(format!("{}={}", key, value));
                    }
                    key_found = true;
                } else {
                    lines.push(line);
                }
            }
        }

        if !key_found && !value.is_empty() {
            lines.push(format!("{}={}", key, value));
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(env_path)?;

        for line in lines {
            writeln!(file, "{}", line)?;
        }

        Ok(())
    }

    /// Cria um `.env` de exemplo quando ainda não existe
    pub fn create_env_file_if_not_exists() -> AuthResult<()> {
        if Path::new(".env").exists() {
            return Ok(());
        }

        let default_content = format!(
            r#"# Linear API key (modo mais simples; tem precedência sobre OAuth)
LINEAR_API_KEY=

# Linear OAuth2 application
LINEAR_CLIENT_ID=your_client_id_here
LINEAR_CLIENT_SECRET=your_client_secret_here
LINEAR_REDIRECT_URI=http://localhost:{port}/callback

# Tokens (preenchidos automaticamente pelo comando `linear auth`)
LINEAR_ACCESS_TOKEN=
LINEAR_REFRESH_TOKEN=
LINEAR_TOKEN_EXPIRES_AT=

# Overrides opcionais
# LINEAR_API_URL=https://api.linear.app/graphql
# LINEAR_AUTHORIZE_URL=https://linear.app/oauth/authorize
# LINEAR_TOKEN_URL=https://api.linear.app/oauth/token
LINEAR_CALLBACK_PORT={port}
"#,
            port = DEFAULT_CALLBACK_PORT
        );

        std::fs::write(".env", default_content)?;
        tracing::info!("Created .env template");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_endpoints_default_to_production() {
        temp_env::with_vars_unset(
            vec!["LINEAR_AUTHORIZE_URL", "LINEAR_TOKEN_URL", "LINEAR_API_URL"],
            || {
                let endpoints = Endpoints::from_env();
                assert_eq!(endpoints.authorize_url, "https://linear.app/oauth/authorize");
                assert_eq!(endpoints.token_url, "https://api.linear.app/oauth/token");
                assert_eq!(endpoints.api_url, "https://api.linear.app/graphql");
            },
        );
    }

    #[test]
    fn test_endpoints_env_override() {
        temp_env::with_var("LINEAR_API_URL", Some("http://localhost:9999/graphql"), || {
            let endpoints = Endpoints::from_env();
            assert_eq!(endpoints.api_url, "http://localhost:9999/graphql");
            assert_eq!(endpoints.token_url, "https://api.linear.app/oauth/token");
        });
    }

    #[test]
    fn test_credential_prefers_api_key() {
        temp_env::with_vars(
            vec![
                ("LINEAR_API_KEY", Some("lin_api_xyz")),
                ("LINEAR_CLIENT_ID", Some("c")),
                ("LINEAR_CLIENT_SECRET", Some("s")),
            ],
            || {
                let credential = EnvManager::credential().unwrap();
                assert_eq!(credential, Credential::api_key("lin_api_xyz"));
            },
        );
    }

    #[test]
    fn test_credential_assembles_oauth_triple() {
        temp_env::with_vars(
            vec![
                ("LINEAR_API_KEY", None),
                ("LINEAR_CLIENT_ID", Some("c")),
                ("LINEAR_CLIENT_SECRET", Some("s")),
                ("LINEAR_REDIRECT_URI", Some("http://x/cb")),
            ],
            || {
                let credential = EnvManager::credential().unwrap();
                assert_eq!(credential, Credential::oauth("c", "s", "http://x/cb"));
            },
        );
    }

    #[test]
    fn test_credential_missing_client_id_is_env_error() {
        temp_env::with_vars(
            vec![
                ("LINEAR_API_KEY", None),
                ("LINEAR_CLIENT_ID", None),
                ("LINEAR_CLIENT_SECRET", Some("s")),
            ],
            || {
                let error = EnvManager::credential().unwrap_err();
                assert!(error.to_string().contains("LINEAR_CLIENT_ID"));
            },
        );
    }

    #[test]
    fn test_credential_blank_api_key_falls_back_to_oauth() {
        temp_env::with_vars(
            vec![
                ("LINEAR_API_KEY", Some("  ")),
                ("LINEAR_CLIENT_ID", Some("c")),
                ("LINEAR_CLIENT_SECRET", Some("s")),
                ("LINEAR_REDIRECT_URI", Some("http://x/cb")),
            ],
            || {
                let credential = EnvManager::credential().unwrap();
                assert!(matches!(credential, Credential::OAuth(_)));
            },
        );
    }

    #[test]
    fn test_token_state_roundtrip_in_process_env() {
        let expires_at = Utc::now() + Duration::hours(1);
        let state = TokenState::new("a1", Some("r1".to_string()), Some(expires_at));

        temp_env::with_vars_unset(
            vec![
                "LINEAR_ACCESS_TOKEN",
                "LINEAR_REFRESH_TOKEN",
                "LINEAR_TOKEN_EXPIRES_AT",
            ],
            || {
                EnvManager::save_token_state(&state).unwrap();
                let restored = EnvManager::load_token_state().unwrap();
                assert_eq!(restored.access_token, "a1");
                assert_eq!(restored.refresh_token.as_deref(), Some("r1"));
                // RFC 3339 preserva o instante com precisão de segundos
                let delta = (restored.expires_at.unwrap() - expires_at).num_seconds().abs();
                assert!(delta <= 1);

                EnvManager::clear_token_state().unwrap();
                assert!(EnvManager::load_token_state().is_none());
            },
        );
    }

    #[test]
    fn test_load_token_state_without_refresh() {
        temp_env::with_vars(
            vec![
                ("LINEAR_ACCESS_TOKEN", Some("lin_api_static")),
                ("LINEAR_REFRESH_TOKEN", None),
                ("LINEAR_TOKEN_EXPIRES_AT", None),
            ],
            || {
                let state = EnvManager::load_token_state().unwrap();
                assert_eq!(state.access_token, "lin_api_static");
                assert!(state.refresh_token.is_none());
                assert!(state.expires_at.is_none());
                assert!(!state.is_expired());
            },
        );
    }

    #[test]
    fn test_load_token_state_ignores_bad_expiry() {
        temp_env::with_vars(
            vec![
                ("LINEAR_ACCESS_TOKEN", Some("a1")),
                ("LINEAR_TOKEN_EXPIRES_AT", Some("not-a-date")),
            ],
            || {
                let state = EnvManager::load_token_state().unwrap();
                assert!(state.expires_at.is_none());
            },
        );
    }

    #[test]
    fn test_callback_port_default() {
        temp_env::with_var_unset("LINEAR_CALLBACK_PORT", || {
            let manager = EnvManager::load().unwrap();
            assert_eq!(manager.callback_port, DEFAULT_CALLBACK_PORT);
        });

        temp_env::with_var("LINEAR_CALLBACK_PORT", Some("9000"), || {
            let manager = EnvManager::load().unwrap();
            assert_eq!(manager.callback_port, 9000);
        });
    }

    #[test]
    fn test_update_env_file_preserves_unrelated_lines() {
        use std::io::Read;

        let dir = tempfile::tempdir().unwrap();
        let original = env::current_dir().unwrap();
        env::set_current_dir(dir.path()).unwrap();

        std::fs::write(".env", "OTHER_VAR=keep\nLINEAR_ACCESS_TOKEN=old\n").unwrap();
        EnvManager::update_env_file("LINEAR_ACCESS_TOKEN", "new").unwrap();
        EnvManager::update_env_file("LINEAR_REFRESH_TOKEN", "r1").unwrap();

        let mut content = String::new();
        std::fs::File::open(".env")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();

        env::set_current_dir(original).unwrap();

        assert!(content.contains("OTHER_VAR=keep"));
        assert!(content.contains("LINEAR_ACCESS_TOKEN=new"));
        assert!(!content.contains("LINEAR_ACCESS_TOKEN=old"));
        assert!(content.contains("LINEAR_REFRESH_TOKEN=r1"));
    }
}
