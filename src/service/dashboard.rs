use std::sync::Arc;

use async_trait::async_trait;
use http::{Method, Response, StatusCode};
use matchit::Router;
use pingora::{
    apps::http_app::ServeHttp, protocols::http::ServerSession, services::listening::Service,
};

use crate::{
    core::RouterStore,
    icons::IconResolver,
    render::{Page, Renderer},
    traefik::TraefikClient,
    utils::response::ResponseBuilder,
};

use super::health::health_response;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Endpoint {
    Index,
    Health,
    Icon,
}

/// Serves the router table, the health probe and cached icons.
pub struct DashboardHttpApp {
    store: Arc<RouterStore>,
    client: Option<TraefikClient>,
    renderer: Box<dyn Renderer>,
    icons: Option<Arc<IconResolver>>,
    router: Router<Endpoint>,
}

impl DashboardHttpApp {
    pub fn new(
        store: Arc<RouterStore>,
        client: Option<TraefikClient>,
        renderer: Box<dyn Renderer>,
        icons: Option<Arc<IconResolver>>,
    ) -> Self {
        let mut router = Router::new();
        for (path, endpoint) in [
            ("/", Endpoint::Index),
            ("/health", Endpoint::Health),
            ("/icons/{file}", Endpoint::Icon),
        ] {
            router
                .insert(path, endpoint)
                .expect("dashboard routes do not conflict");
        }

        Self {
            store,
            client,
            renderer,
            icons,
            router,
        }
    }

    pub fn dashboard_http_service(self, addr: &str) -> Service<Self> {
        let mut service = Service::new("Dashboard HTTP".to_string(), self);
        service.add_tcp(addr);
        service
    }

    /// Routes one request. Split from [`ServeHttp::response`] so it can be
    /// driven without a live session.
    pub async fn handle(&self, method: &Method, path: &str) -> Response<Vec<u8>> {
        let Ok(matched) = self.router.at(path) else {
            return ResponseBuilder::not_found();
        };

        if method != Method::GET && method != Method::HEAD {
            return ResponseBuilder::error(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        }

        match matched.value {
            Endpoint::Index => self.index(),
            Endpoint::Health => health_response(self.client.as_ref()).await,
            Endpoint::Icon => match matched.params.get("file") {
                Some(file) => self.icon(file).await,
                None => ResponseBuilder::not_found(),
            },
        }
    }

    fn index(&self) -> Response<Vec<u8>> {
        let snapshot = self.store.snapshot();
        let page = Page {
            routers: &snapshot.routers,
            refreshed_ago: snapshot.refreshed_at.map(|at| at.elapsed()),
        };

        match self.renderer.render(&page) {
            Ok(html) => ResponseBuilder::html(html),
            Err(e) => {
                log::error!("Error rendering dashboard: {e}");
                ResponseBuilder::internal_error()
            }
        }
    }

    async fn icon(&self, file: &str) -> Response<Vec<u8>> {
        let Some(icons) = &self.icons else {
            return ResponseBuilder::not_found();
        };

        match icons.read_icon(file).await {
            Some((bytes, content_type)) => {
                ResponseBuilder::with_body(StatusCode::OK, bytes, content_type)
            }
            None => ResponseBuilder::not_found(),
        }
    }
}

#[async_trait]
impl ServeHttp for DashboardHttpApp {
    async fn response(&self, http_session: &mut ServerSession) -> Response<Vec<u8>> {
        http_session.set_keepalive(None);

        let (method, path) = {
            let req_header = http_session.req_header();
            (req_header.method.clone(), req_header.uri.path().to_string())
        };

        self.handle(&method, &path).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        config,
        core::{DashboardError, DashboardResult},
        render::HtmlRenderer,
        testing::{init_log, FakeTraefik},
        traefik::DisplayRouter,
    };

    struct FailingRenderer;

    impl Renderer for FailingRenderer {
        fn render(&self, _page: &Page<'_>) -> DashboardResult<String> {
            Err(DashboardError::Render("template exploded at line 3".to_string()))
        }
    }

    fn web_router() -> DisplayRouter {
        DisplayRouter {
            name: "web".to_string(),
            rule: "Host(`y.com`)".to_string(),
            service: "s".to_string(),
            status: "disabled".to_string(),
            entry_points: vec![],
            tls: false,
            url: "https://y.com".to_string(),
            icon: None,
        }
    }

    fn app(store: Arc<RouterStore>, client: Option<TraefikClient>) -> DashboardHttpApp {
        DashboardHttpApp::new(store, client, Box::new(HtmlRenderer::default()), None)
    }

    #[tokio::test]
    async fn test_index_renders_snapshot() {
        init_log();
        let store = Arc::new(RouterStore::new());
        store.replace(vec![web_router()]);
        let app = app(store, None);

        let resp = app.handle(&Method::GET, "/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = String::from_utf8(resp.into_body()).unwrap();
        assert!(html.contains("https://y.com"));
    }

    #[tokio::test]
    async fn test_index_renders_empty_store() {
        init_log();
        let app = app(Arc::new(RouterStore::new()), None);

        let resp = app.handle(&Method::GET, "/").await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_render_error_is_hidden() {
        init_log();
        let app = DashboardHttpApp::new(
            Arc::new(RouterStore::new()),
            None,
            Box::new(FailingRenderer),
            None,
        );

        let resp = app.handle(&Method::GET, "/").await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = String::from_utf8(resp.into_body()).unwrap();
        assert_eq!(body, "Internal Server Error");
    }

    #[tokio::test]
    async fn test_unknown_path_returns_404() {
        init_log();
        let app = app(Arc::new(RouterStore::new()), None);

        for path in ["/foo", "/index.html", "/health/extra", "/icons/"] {
            let resp = app.handle(&Method::GET, path).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{path}");
        }
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        init_log();
        let app = app(Arc::new(RouterStore::new()), None);

        let resp = app.handle(&Method::POST, "/").await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_health_does_not_read_store() {
        init_log();
        let upstream = FakeTraefik::start(500, "").await;
        let client = TraefikClient::new(&upstream.base_url(), Duration::from_secs(5)).unwrap();
        let store = Arc::new(RouterStore::new());
        store.replace(vec![web_router()]);
        let app = app(store, Some(client));

        let resp = app.handle(&Method::GET, "/health").await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(json["status_code"], 500);
    }

    #[tokio::test]
    async fn test_health_without_config_makes_no_request() {
        init_log();
        let app = app(Arc::new(RouterStore::new()), None);

        let resp = app.handle(&Method::GET, "/health").await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(json["error"], "TRAEFIK_API environment variable not set");
    }

    #[tokio::test]
    async fn test_serves_cached_icons() {
        init_log();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("grafana.svg"), b"<svg/>").unwrap();
        let cfg = config::Icons {
            dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let icons = Arc::new(IconResolver::new(&cfg).unwrap());
        let app = DashboardHttpApp::new(
            Arc::new(RouterStore::new()),
            None,
            Box::new(HtmlRenderer::default()),
            Some(icons),
        );

        let resp = app.handle(&Method::GET, "/icons/grafana.svg").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], "image/svg+xml");
        assert_eq!(resp.body(), b"<svg/>");

        let resp = app.handle(&Method::GET, "/icons/missing.svg").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_icons_disabled() {
        init_log();
        let app = app(Arc::new(RouterStore::new()), None);

        let resp = app.handle(&Method::GET, "/icons/grafana.svg").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
