use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use warp::Filter;

use crate::error::{AuthError, AuthResult};

/// Tempo máximo de espera pelo redirect de autorização
const CALLBACK_TIMEOUT_SECS: u64 = 300;

/// Servidor HTTP local que captura o redirect de autorização do Linear
pub struct CallbackServer {
    port: u16,
    state: String,
}

/// Parâmetros extraídos de um callback bem-sucedido
#[derive(Debug)]
pub struct CallbackResult {
    pub code: String,
    pub state: String,
}

/// Servidor já vinculado à porta, rodando em segundo plano à espera do
/// redirect. Obtido via [`CallbackServer::start`].
pub struct CallbackHandle {
    address: std::net::SocketAddr,
    receiver: oneshot::Receiver<AuthResult<CallbackResult>>,
    server_task: tokio::task::JoinHandle<()>,
}

impl CallbackServer {
    /// Cria o servidor para a porta e o state esperados.
    ///
    /// O state deve ser o mesmo embutido na URL de autorização; callbacks
    /// com state divergente são rejeitados.
    pub fn new(port: u16, state: impl Into<String>) -> Self {
        Self {
            port,
            state: state.into(),
        }
    }

    /// Vincula a porta e sobe o servidor em segundo plano.
    ///
    /// A porta precisa estar vinculada antes de o navegador ser aberto:
    /// um redirect rápido não pode encontrar a porta fechada, e uma porta
    /// ocupada precisa falhar antes de o usuário chegar à tela de
    /// consentimento. Atende `GET /callback` com os query params enviados
    /// pelo Linear e devolve uma página HTML ao navegador.
    pub fn start(self) -> AuthResult<CallbackHandle> {
        let expected_state = self.state.clone();
        let (tx, rx) = oneshot::channel::<AuthResult<CallbackResult>>();
        let tx = Arc::new(Mutex::new(Some(tx)));

        let callback_route = warp::path("callback")
            .and(warp::query::<HashMap<String, String>>())
            .and_then({
                let tx = tx.clone();
                let expected_state = expected_state.clone();
                move |params: HashMap<String, String>| {
                    let tx = tx.clone();
                    let expected_state = expected_state.clone();

                    async move {
                        tracing::debug!(params = ?params.keys(), "authorization callback received");

                        let result = Self::process_callback(params, &expected_state);
                        let is_success = result.is_ok();

                        if let Ok(mut sender) = tx.lock() {
                            if let Some(tx) = sender.take() {
                                let _ = tx.send(result);
                            }
                        }

                        let html_response = if is_success {
                            warp::reply::html(SUCCESS_PAGE)
                        } else {
                            warp::reply::html(ERROR_PAGE)
                        };
                        Ok::<_, warp::Rejection>(html_response)
                    }
                }
            });

        // Página de espera para quem abrir a raiz antes de autorizar
        let status_route = warp::path::end().map(|| warp::reply::html(WAITING_PAGE));

        let routes = callback_route.or(status_route).with(warp::trace::request());

        let addr = ([127, 0, 0, 1], self.port);
        let (actual_addr, server_future) = warp::serve(routes)
            .try_bind_ephemeral(addr)
            .map_err(|e| AuthError::callback(format!("failed to bind callback server: {}", e)))?;

        tracing::info!(address = %actual_addr, "callback server listening");

        let server_task = tokio::spawn(server_future);

        Ok(CallbackHandle {
            address: actual_addr,
            receiver: rx,
            server_task,
        })
    }

    /// Valida os query params do redirect e extrai código e state
    fn process_callback(
        params: HashMap<String, String>,
        expected_state: &str,
    ) -> AuthResult<CallbackResult> {
        if let Some(error) = params.get("error") {
            let description = params
                .get("error_description")
                .cloned()
                .unwrap_or_else(|| error.clone());

            if error == "access_denied" {
                return Err(AuthError::AccessDenied(description));
            }
            return Err(AuthError::callback(format!("{}: {}", error, description)));
        }

        let code = params
            .get("code")
            .ok_or_else(|| AuthError::callback("callback missing authorization code"))?;

        // Proteção CSRF: o state precisa bater com o emitido na URL
        let received_state = params.get("state").ok_or(AuthError::InvalidState)?;
        if received_state != expected_state {
            return Err(AuthError::InvalidState);
        }

        Ok(CallbackResult {
            code: code.clone(),
            state: received_state.clone(),
        })
    }
}

impl CallbackHandle {
    /// Endereço efetivamente vinculado (com a porta resolvida quando o
    /// servidor foi criado com porta 0)
    pub fn address(&self) -> std::net::SocketAddr {
        self.address
    }

    /// Aguarda um único callback e encerra o servidor.
    ///
    /// Expira depois de cinco minutos sem callback.
    pub async fn wait(self) -> AuthResult<CallbackResult> {
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(CALLBACK_TIMEOUT_SECS),
            self.receiver,
        )
        .await;

        self.server_task.abort();

        match result {
            Ok(Ok(callback_result)) => callback_result,
            Ok(Err(_)) => Err(AuthError::callback("callback channel closed")),
            Err(_) => Err(AuthError::Timeout),
        }
    }
}

// Páginas HTML devolvidas ao navegador durante o fluxo
const WAITING_PAGE: &str = r#"
<!DOCTYPE html>
<html>
<head>
    <title>Linear OAuth2 - Aguardando Autorização</title>
    <meta charset="UTF-8">
    <style>
        body {
            font-family: Arial, sans-serif;
            margin: 0;
            padding: 20px;
            background: #f5f5f5;
            text-align: center;
        }
        .container {
            max-width: 600px;
            margin: 50px auto;
            background: white;
            padding: 30px;
            border-radius: 8px;
            box-shadow: 0 2px 10px rgba(0,0,0,0.1);
        }
        h1 { color: #5e6ad2; }
        .spinner {
            border: 4px solid #f3f3f3;
            border-top: 4px solid #5e6ad2;
            border-radius: 50%;
            width: 40px;
            height: 40px;
            animation: spin 1s linear infinite;
            margin: 20px auto;
        }
        @keyframes spin {
            0% { transform: rotate(0deg); }
            100% { transform: rotate(360deg); }
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>🔐 Linear OAuth2</h1>
        <div class="spinner"></div>
        <h2>Aguardando autorização...</h2>
        <p>Por favor, complete o processo de autorização no Linear.</p>
        <p>Esta página será atualizada quando a autorização for concluída.</p>
    </div>
</body>
</html>
"#;

const SUCCESS_PAGE: &str = r#"
<!DOCTYPE html>
<html>
<head>
    <title>Linear OAuth2 - Autorização Concluída</title>
    <meta charset="UTF-8">
    <style>
        body {
            font-family: Arial, sans-serif;
            margin: 0;
            padding: 20px;
            background: #f5f5f5;
            text-align: center;
        }
        .container {
            max-width: 600px;
            margin: 50px auto;
            background: white;
            padding: 30px;
            border-radius: 8px;
            box-shadow: 0 2px 10px rgba(0,0,0,0.1);
        }
        h1 { color: #28a745; }
        .success-icon {
            font-size: 64px;
            color: #28a745;
            margin: 20px 0;
        }
    </style>
</head>
<body>
    <div class="container">
        <div class="success-icon">✅</div>
        <h1>Autorização Concluída!</h1>
        <p>Autorização do Linear realizada com sucesso!</p>
        <p>Você pode fechar esta janela e retornar ao terminal.</p>
    </div>
    <script>
        setTimeout(() => {
            window.close();
        }, 3000);
    </script>
</body>
</html>
"#;

const ERROR_PAGE: &str = r#"
<!DOCTYPE html>
<html>
<head>
    <title>Linear OAuth2 - Erro na Autorização</title>
    <meta charset="UTF-8">
    <style>
        body {
            font-family: Arial, sans-serif;
            margin: 0;
            padding: 20px;
            background: #f5f5f5;
            text-align: center;
        }
        .container {
            max-width: 600px;
            margin: 50px auto;
            background: white;
            padding: 30px;
            border-radius: 8px;
            box-shadow: 0 2px 10px rgba(0,0,0,0.1);
        }
        h1 { color: #dc3545; }
        .error-icon {
            font-size: 64px;
            color: #dc3545;
            margin: 20px 0;
        }
    </style>
</head>
<body>
    <div class="container">
        <div class="error-icon">❌</div>
        <h1>Erro na Autorização</h1>
        <p>Ocorreu um erro durante o processo de autorização do Linear.</p>
        <p>Verifique o terminal para mais detalhes. Você pode fechar esta janela.</p>
    </div>
</body>
</html>
"#;
