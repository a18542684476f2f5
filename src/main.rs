mod config;

use api::{lobby::Lobby, Api, Reply};
use core::convert::Infallible;
use hyper::{body::Incoming, server::conn::http1, service, Request};
use hyper_util::rt::TokioIo;
use quiz::QuestionStore;
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, runtime::Runtime};

async fn respond(api: &Api, req: Request<Incoming>) -> Reply {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    match api.try_respond(req).await {
        Ok(res) => {
            log::debug!("{method} {path} -> {}", res.status());
            res
        }
        Err(code) => {
            log::warn!("{method} {path} -> {code}");
            let mut res = Reply::default();
            *res.status_mut() = code;
            res
        }
    }
}

async fn serve(addr: SocketAddr, api: Arc<Api>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("serving the quiz at http://{addr}/");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        let (stream, peer) = tokio::select! {
            biased;
            result = &mut shutdown => {
                result?;
                break;
            }
            conn = listener.accept() => match conn {
                Ok(pair) => pair,
                Err(err) => {
                    log::error!("failed to accept connection: {err}");
                    continue;
                }
            },
        };

        let api = Arc::clone(&api);
        tokio::spawn(async move {
            let service = service::service_fn(move |req| {
                let api = Arc::clone(&api);
                async move { Ok::<_, Infallible>(respond(&api, req).await) }
            });
            if let Err(err) = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await {
                log::error!("connection with {peer} failed: {err}");
            }
        });
    }

    log::info!("shutting down with {} live sessions", api.lobby().len());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = config::Config::from_env()?;

    // Refuse to serve anything if the question set is unusable
    let store = match QuestionStore::open(&config.questions) {
        Ok(store) => store,
        Err(err) => {
            log::error!("cannot load {}: {err}", config.questions.display());
            return Err(err.into());
        }
    };
    log::info!("loaded {} questions from {}", store.len(), config.questions.display());

    let lobby = Lobby::new(store, config.options).with_limits(config.limits);
    let api = Arc::new(Api::from(lobby));
    let runtime = Runtime::new()?;
    runtime.block_on(serve(config.addr, api))
}
