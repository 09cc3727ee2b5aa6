//! Dashboard HTTP endpoint
//!
//! Serves the static dashboard page at `/`, the live JSON snapshot at
//! `/data`, and accepts display override messages at `POST /display`.
//! Uses hyper for the HTTP server. Strictly read-only against shared
//! state except for the display override, which is the one write the
//! presentation lane owns.

use crate::domain::OverrideMessage;
use crate::infra::state::StateStore;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset='UTF-8'>
    <meta name='viewport' content='width=device-width,initial-scale=1.0'>
    <title>Parking Dashboard</title>
    <style>
        *{margin:0;padding:0;box-sizing:border-box}
        body{font-family:'Segoe UI',Arial,sans-serif;background:#1b2430;color:#eceff4;min-height:100vh;padding:20px}
        .container{max-width:960px;margin:0 auto}
        h1{text-align:center;font-size:2em;margin-bottom:6px}
        .subtitle{text-align:center;opacity:0.7;margin-bottom:24px}
        .status-bar{background:#232e3d;border-radius:10px;padding:12px;margin-bottom:18px;display:flex;justify-content:space-around;flex-wrap:wrap}
        .status-item{text-align:center;padding:6px 12px}
        .status-item .label{font-size:0.8em;opacity:0.7}
        .status-item .value{font-size:1.1em;font-weight:bold}
        .grid{display:grid;grid-template-columns:repeat(auto-fit,minmax(200px,1fr));gap:14px}
        .card{background:#232e3d;border-radius:12px;padding:20px;text-align:center}
        .card .label{font-size:0.85em;opacity:0.7;text-transform:uppercase;letter-spacing:1px}
        .card .stat{font-size:2.4em;font-weight:bold;margin:8px 0}
        .green{color:#6fd08c}
        .red{color:#e06c75}
        .blue{color:#61afef}
        .footer{text-align:center;margin-top:24px;opacity:0.5;font-size:0.85em}
    </style>
</head>
<body>
    <div class='container'>
        <h1>Parking Dashboard</h1>
        <div class='subtitle'>Live lot status</div>
        <div class='status-bar'>
            <div class='status-item'><div class='label'>Date</div><div class='value' id='date'>--</div></div>
            <div class='status-item'><div class='label'>Time</div><div class='value' id='time'>--</div></div>
            <div class='status-item'><div class='label'>WiFi</div><div class='value' id='wifi'>--</div></div>
            <div class='status-item'><div class='label'>Internet</div><div class='value' id='internet'>--</div></div>
            <div class='status-item'><div class='label'>Uptime</div><div class='value' id='uptime'>--</div></div>
        </div>
        <div class='grid'>
            <div class='card'><div class='label'>Available</div><div id='available' class='stat green'>0</div></div>
            <div class='card'><div class='label'>Occupied</div><div id='occupied' class='stat red'>0</div></div>
            <div class='card'><div class='label'>Gate</div><div id='gate' class='stat red'>Closed</div></div>
            <div class='card'><div class='label'>Temperature</div><div id='temp' class='stat blue'>--</div></div>
            <div class='card'><div class='label'>Humidity</div><div id='humid' class='stat blue'>--</div></div>
        </div>
        <div class='footer'>carpark controller</div>
    </div>
    <script>
        function formatUptime(sec) {
            const h = Math.floor(sec / 3600);
            const m = Math.floor((sec % 3600) / 60);
            const s = sec % 60;
            return h + 'h ' + m + 'm ' + s + 's';
        }
        async function update() {
            try {
                const r = await fetch('/data');
                const d = await r.json();
                document.getElementById('available').innerText = d.available;
                document.getElementById('occupied').innerText = d.occupied;
                const g = document.getElementById('gate');
                g.innerText = d.gate;
                g.className = d.gate == 'Open' ? 'stat green' : 'stat red';
                document.getElementById('temp').innerText = d.temperature.toFixed(1) + ' C';
                document.getElementById('humid').innerText = d.humidity.toFixed(1) + ' %';
                document.getElementById('date').innerText = d.date;
                document.getElementById('time').innerText = d.time;
                document.getElementById('wifi').innerText = d.wifi ? 'up' : 'down';
                document.getElementById('internet').innerText = d.internet ? 'up' : 'down';
                document.getElementById('uptime').innerText = formatUptime(d.uptime);
            } catch (e) {
                console.error(e);
            }
        }
        setInterval(update, 1000);
        update();
    </script>
</body>
</html>
"#;

/// Handle HTTP requests
async fn handle_request(
    req: Request<hyper::body::Incoming>,
    store: Arc<StateStore>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    // The override post consumes the request body, so it cannot share the
    // borrowing match below
    if req.method() == Method::POST && req.uri().path() == "/display" {
        return post_display(req, store).await;
    }

    match (req.method(), req.uri().path()) {
        (&Method::GET, "/") => Ok(Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "text/html; charset=utf-8")
            .body(Full::new(Bytes::from(DASHBOARD_HTML)))
            .expect("static response should not fail")),
        (&Method::GET, "/data") => {
            let snapshot = store.snapshot();
            let body = match serde_json::to_vec(&snapshot) {
                Ok(body) => body,
                Err(e) => {
                    error!(error = %e, "snapshot_serialize_failed");
                    return Ok(Response::builder()
                        .status(StatusCode::INTERNAL_SERVER_ERROR)
                        .body(Full::new(Bytes::from("serialization error")))
                        .expect("static response should not fail"));
                }
            };
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "application/json")
                .body(Full::new(Bytes::from(body)))
                .expect("static response should not fail"))
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("Not Found")))
            .expect("static response should not fail")),
    }
}

/// POST /display - accept a display override message
async fn post_display(
    req: Request<hyper::body::Incoming>,
    store: Arc<StateStore>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "display_override_body_error");
            return Ok(bad_request("unreadable body"));
        }
    };
    let message: OverrideMessage = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "display_override_parse_error");
            return Ok(bad_request("invalid JSON"));
        }
    };

    if store.post_override(message) {
        info!("display_override_posted");
        Ok(Response::builder()
            .status(StatusCode::NO_CONTENT)
            .body(Full::new(Bytes::new()))
            .expect("static response should not fail"))
    } else {
        // Bounded lock acquisition timed out; the client may retry
        Ok(Response::builder()
            .status(StatusCode::SERVICE_UNAVAILABLE)
            .body(Full::new(Bytes::from("busy, retry")))
            .expect("static response should not fail"))
    }
}

fn bad_request(reason: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .body(Full::new(Bytes::from(reason)))
        .expect("static response should not fail")
}

/// Start the dashboard HTTP server
pub async fn start_dashboard_server(
    bind_address: &str,
    port: u16,
    store: Arc<StateStore>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{bind_address}:{port}")
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid dashboard bind address: {e}"))?;
    let listener = TcpListener::bind(addr).await?;

    info!(addr = %addr, "dashboard_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let store = store.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let store = store.clone();
                                async move { handle_request(req, store).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "dashboard_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "dashboard_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("dashboard_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}
