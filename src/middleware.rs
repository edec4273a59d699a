//! Response hardening: fixed security headers and an optional HTTPS redirect.

use crate::config::SecurityConfig;
use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::middleware::DefaultHeaders;
use actix_web::{Error, HttpResponse};
use futures::future::{ready, LocalBoxFuture, Ready};

pub const CONTENT_SECURITY_POLICY: &str =
    "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data: https:; frame-ancestors 'none'";

/// Headers attached to every response. HSTS is only sent when the
/// deployment also redirects plain HTTP.
pub fn security_headers(security: &SecurityConfig) -> DefaultHeaders {
    let headers = DefaultHeaders::new()
        .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .add((header::X_FRAME_OPTIONS, "DENY"))
        .add((header::X_XSS_PROTECTION, "1; mode=block"))
        .add((header::REFERRER_POLICY, "same-origin"))
        .add((header::CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY));

    if security.ssl_redirect && security.hsts_seconds > 0 {
        headers.add((
            header::STRICT_TRANSPORT_SECURITY,
            format!("max-age={}; includeSubDomains", security.hsts_seconds),
        ))
    } else {
        headers
    }
}

/// Answers plain-HTTP requests with a 301 to the same URL over https.
/// Does nothing unless `enabled`.
#[derive(Debug, Clone, Copy)]
pub struct HttpsRedirect {
    enabled: bool,
}

impl HttpsRedirect {
    pub fn new(enabled: bool) -> Self {
        HttpsRedirect { enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for HttpsRedirect
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = HttpsRedirectMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(HttpsRedirectMiddleware {
            service,
            enabled: self.enabled,
        }))
    }
}

pub struct HttpsRedirectMiddleware<S> {
    service: S,
    enabled: bool,
}

impl<S, B> Service<ServiceRequest> for HttpsRedirectMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let info = req.connection_info().clone();
        if !self.enabled || info.scheme() == "https" {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        }

        let location = format!("https://{}{}", info.host(), req.uri());
        log::debug!("Redirecting plain HTTP request to {}", location);
        let (http_req, _payload) = req.into_parts();
        let response = HttpResponse::MovedPermanently()
            .insert_header((header::LOCATION, location))
            .finish()
            .map_into_right_body();
        Box::pin(async move { Ok(ServiceResponse::new(http_req, response)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    fn security(ssl_redirect: bool) -> SecurityConfig {
        SecurityConfig {
            ssl_redirect,
            hsts_seconds: 3600,
            bcrypt_cost: 4,
        }
    }

    #[actix_web::test]
    async fn plain_http_is_redirected_when_enabled() {
        let app = test::init_service(
            App::new()
                .wrap(HttpsRedirect::new(true))
                .route("/ping", web::get().to(ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/ping?x=1")
            .insert_header((header::HOST, "library.example"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 301);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "https://library.example/ping?x=1"
        );
    }

    #[actix_web::test]
    async fn forwarded_https_passes_through() {
        let app = test::init_service(
            App::new()
                .wrap(HttpsRedirect::new(true))
                .route("/ping", web::get().to(ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/ping")
            .insert_header(("X-Forwarded-Proto", "https"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
    }

    #[actix_web::test]
    async fn hsts_only_with_redirect() {
        let app = test::init_service(
            App::new()
                .wrap(security_headers(&security(true)))
                .route("/ping", web::get().to(ok)),
        )
        .await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
        assert_eq!(
            resp.headers().get(header::STRICT_TRANSPORT_SECURITY).unwrap(),
            "max-age=3600; includeSubDomains"
        );
        assert_eq!(resp.headers().get(header::X_FRAME_OPTIONS).unwrap(), "DENY");

        let app = test::init_service(
            App::new()
                .wrap(security_headers(&security(false)))
                .route("/ping", web::get().to(ok)),
        )
        .await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
        assert!(resp.headers().get(header::STRICT_TRANSPORT_SECURITY).is_none());
        assert_eq!(
            resp.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
            "nosniff"
        );
    }
}
