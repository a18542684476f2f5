pub mod lobby;
pub mod page;
pub mod state;
pub mod util;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::{
    body::{Body, Bytes},
    header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE, LOCATION, SET_COOKIE},
    Method, Request, Response, StatusCode,
};
use core::fmt;
use lobby::Lobby;
use quiz::{QuizSession, SessionError};
use util::session::{extract_session, SessionId};

pub const TEXT_HTML: &str = "text/html; charset=utf-8";
pub const APPLICATION_JSON: &str = "application/json";

/// Form submissions are tiny. Anything larger is rejected outright.
const MAX_FORM_BYTES: usize = 1024;

pub type Reply = Response<Full<Bytes>>;
type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn status_of(err: &SessionError) -> StatusCode {
    match err {
        SessionError::InvalidOptionIndex { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::CONFLICT,
    }
}

fn with_content(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Reply {
    let mut res = Response::new(Full::new(body.into()));
    *res.status_mut() = status;
    let headers = res.headers_mut();
    assert!(headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type)).is_none());
    assert!(headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store")).is_none());
    res
}

fn html(status: StatusCode, body: String) -> Reply {
    with_content(status, TEXT_HTML, body)
}

fn render_failed(err: fmt::Error) -> StatusCode {
    log::error!("failed to render page: {err}");
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Moves past an answered question, logging the tally when that was the last one.
fn advance(session: &mut QuizSession) -> Result<(), SessionError> {
    session.advance()?;
    if let Ok(summary) = session.summary() {
        log::info!("session finished with {}/{}", summary.score(), summary.total());
    }
    Ok(())
}

/// Post/Redirect/Get back to the main page.
fn see_other() -> Reply {
    let mut res = Response::new(Full::default());
    *res.status_mut() = StatusCode::SEE_OTHER;
    assert!(res.headers_mut().insert(LOCATION, HeaderValue::from_static("/")).is_none());
    res
}

async fn read_form<B>(body: B) -> Result<Bytes, StatusCode>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    match Limited::new(body, MAX_FORM_BYTES).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => Err(StatusCode::PAYLOAD_TOO_LARGE),
        Err(err) => {
            log::error!("failed to read request body: {err}");
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

/// HTTP front of the quiz: maps requests onto [`Lobby`] sessions.
pub struct Api {
    lobby: Lobby,
}

impl From<Lobby> for Api {
    fn from(lobby: Lobby) -> Self {
        Self { lobby }
    }
}

impl Api {
    pub fn lobby(&self) -> &Lobby {
        &self.lobby
    }

    pub async fn try_respond<B>(&self, req: Request<B>) -> Result<Reply, StatusCode>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let sid = extract_session(&parts.headers).filter(|id| self.lobby.contains(id));
        match (&parts.method, parts.uri.path()) {
            (&Method::GET, "/") => self.on_index(sid),
            (&Method::GET, "/api/state") => self.on_state(sid),
            (&Method::POST, "/start") => self.on_start(sid),
            (&Method::POST, "/answer") => {
                let form = read_form(body).await?;
                let choice = util::form::parse_choice(&form).ok_or_else(|| {
                    log::warn!("rejected answer form without a valid choice");
                    StatusCode::BAD_REQUEST
                })?;
                self.on_answer(sid, choice)
            }
            (&Method::POST, "/next") => self.on_next(sid),
            (&Method::POST, "/reset") => Ok(self.on_reset(sid)),
            (_, "/" | "/api/state" | "/start" | "/answer" | "/next" | "/reset") => Err(StatusCode::METHOD_NOT_ALLOWED),
            _ => Err(StatusCode::NOT_FOUND),
        }
    }

    fn on_index(&self, sid: Option<SessionId>) -> Result<Reply, StatusCode> {
        let rendered = sid.and_then(|id| self.lobby.with_session(&id, |session| page::session(session, None)));
        let body = match rendered {
            Some(body) => body,
            None => {
                let lobby = &self.lobby;
                page::welcome(lobby.questions_per_session(), lobby.store().len(), lobby.options().shuffle)
            }
        };
        Ok(html(StatusCode::OK, body.map_err(render_failed)?))
    }

    fn on_state(&self, sid: Option<SessionId>) -> Result<Reply, StatusCode> {
        let encoded = sid.and_then(|id| {
            self.lobby.with_session(&id, |session| {
                let view = state::StateView::of(session).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
                serde_json::to_vec(&view).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
            })
        });
        let bytes = match encoded {
            Some(result) => result?,
            None => {
                let idle = state::StateView::Idle { total: self.lobby.questions_per_session() };
                serde_json::to_vec(&idle).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            }
        };
        Ok(with_content(StatusCode::OK, APPLICATION_JSON, bytes))
    }

    fn on_start(&self, sid: Option<SessionId>) -> Result<Reply, StatusCode> {
        let id = match sid {
            Some(id) if self.lobby.restart(&id) => id,
            _ => self.lobby.start(),
        };
        let cookie = id.to_cookie().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let mut res = see_other();
        assert!(res.headers_mut().insert(SET_COOKIE, cookie).is_none());
        Ok(res)
    }

    fn on_answer(&self, sid: Option<SessionId>, choice: usize) -> Result<Reply, StatusCode> {
        // Without the feedback screen the answer is only revealed in the final review.
        let skip_feedback = !self.lobby.options().feedback;
        self.on_transition(sid, |session| {
            session.submit_answer(choice)?;
            if skip_feedback {
                advance(session)?;
            }
            Ok(())
        })
    }

    fn on_next(&self, sid: Option<SessionId>) -> Result<Reply, StatusCode> {
        self.on_transition(sid, advance)
    }

    /// Applies a session transition. Failures re-render the page with the error instead of
    /// redirecting, leaving the session exactly as it was.
    fn on_transition<F>(&self, sid: Option<SessionId>, op: F) -> Result<Reply, StatusCode>
    where
        F: FnOnce(&mut QuizSession) -> Result<(), SessionError>,
    {
        let Some(id) = sid else {
            return Ok(see_other());
        };
        let outcome = self.lobby.with_session(&id, |session| {
            let err = op(session).err()?;
            Some((status_of(&err), page::session(session, Some(&err)), err))
        });
        match outcome {
            Some(Some((status, body, err))) => {
                log::warn!("session {id} rejected a transition: {err}");
                Ok(html(status, body.map_err(render_failed)?))
            }
            _ => Ok(see_other()),
        }
    }

    fn on_reset(&self, sid: Option<SessionId>) -> Reply {
        if let Some(id) = sid {
            self.lobby.remove(&id);
        }
        see_other()
    }
}
