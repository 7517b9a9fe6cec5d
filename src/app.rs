use crate::{modules, types::Context};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors, trace};

pub fn router(ctx: Arc<Context>) -> Router {
    Router::new()
        .nest("/api", modules::get_router())
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(1024 * 1024 * 10))
        .layer(trace::TraceLayer::new_for_http())
        .layer(
            cors::CorsLayer::new()
                .allow_methods([
                    Method::OPTIONS,
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                ])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                .allow_origin(cors::Any),
        )
}

pub struct App {
    ctx: Arc<Context>,
    router: Router,
}

impl App {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self {
            router: router(ctx.clone()),
            ctx,
        }
    }

    pub async fn serve(self) -> std::io::Result<()> {
        let addr = format!("{}:{}", self.ctx.app.host, self.ctx.app.port);
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!(
            "App is running on {} as {} ({:?})",
            addr,
            self.ctx.app.url,
            self.ctx.app.environment
        );

        axum::serve(listener, self.router).await
    }
}
