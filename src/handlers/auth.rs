use crate::config::Environment;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::{OtpService, TokenService};
use crate::utils::is_valid_phone;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{HttpRequest, HttpResponse, Result, web};

#[utoipa::path(
    post,
    path = "/auth/send-otp",
    tag = "auth",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "OTP sent", body = ApiBody),
        (status = 400, description = "Missing or invalid phone number", body = ApiBody),
        (status = 500, description = "Internal server error", body = ApiBody)
    )
)]
pub async fn send_otp(
    otp_service: web::Data<OtpService>,
    environment: web::Data<Environment>,
    request: web::Json<SendOtpRequest>,
) -> Result<HttpResponse> {
    match issue_otp(&otp_service, request.into_inner()).await {
        Ok(body) => Ok(HttpResponse::Ok().json(ApiResponse::success(200, body))),
        Err(e) => Ok(e.render(*environment.get_ref())),
    }
}

async fn issue_otp(otp_service: &OtpService, request: SendOtpRequest) -> AppResult<ApiBody> {
    let phone = required(request.phone, "Phone number is required")?;
    if !is_valid_phone(&phone) {
        return Err(AppError::InvalidParameters(
            "Phone number is not valid".to_string(),
        ));
    }

    let (_, delivered) = otp_service.request(&phone).await?;
    if !delivered {
        return Err(AppError::Uncaught("OTP could not be sent".to_string()));
    }

    // the code itself only travels by SMS
    Ok(ApiBody::message("OTP sent successfully"))
}

#[utoipa::path(
    post,
    path = "/auth/verify-otp",
    tag = "auth",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "OTP verified", body = ApiBody),
        (status = 400, description = "Missing or invalid fields", body = ApiBody),
        (status = 401, description = "Wrong, expired or already used OTP", body = ApiBody)
    )
)]
pub async fn verify_otp(
    otp_service: web::Data<OtpService>,
    environment: web::Data<Environment>,
    request: web::Json<VerifyOtpRequest>,
) -> Result<HttpResponse> {
    match check_otp(&otp_service, request.into_inner()).await {
        Ok(body) => Ok(HttpResponse::Ok().json(ApiResponse::success(200, body))),
        Err(e) => Ok(e.render(*environment.get_ref())),
    }
}

async fn check_otp(otp_service: &OtpService, request: VerifyOtpRequest) -> AppResult<ApiBody> {
    let phone = required(request.phone, "Phone number is required")?;
    let code = required(request.code, "Verification code is required")?;

    if !is_valid_phone(&phone) {
        return Err(AppError::InvalidParameters(
            "Phone number is not valid".to_string(),
        ));
    }
    if code.len() != 4 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::InvalidParameters(
            "Verification code must be 4 digits".to_string(),
        ));
    }

    if otp_service.verify(&code, &phone).await? {
        Ok(ApiBody::message("OTP verified successfully"))
    } else {
        Err(AppError::Authentication(
            "OTP is invalid or has expired".to_string(),
        ))
    }
}

#[utoipa::path(
    post,
    path = "/auth/verify-token",
    tag = "auth",
    request_body = VerifyTokenRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Token verified", body = ApiBody),
        (status = 400, description = "Missing token type", body = ApiBody),
        (status = 401, description = "Token rejected", body = ApiBody)
    )
)]
pub async fn verify_token(
    token_service: web::Data<TokenService>,
    environment: web::Data<Environment>,
    req: HttpRequest,
    request: web::Json<VerifyTokenRequest>,
) -> Result<HttpResponse> {
    match check_token(&token_service, &req, request.into_inner()).await {
        Ok(body) => Ok(HttpResponse::Ok().json(ApiResponse::success(200, body))),
        Err(e) => Ok(e.render(*environment.get_ref())),
    }
}

async fn check_token(
    token_service: &TokenService,
    req: &HttpRequest,
    request: VerifyTokenRequest,
) -> AppResult<ApiBody> {
    let token_type = required(request.token_type, "Token type is required")?;
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Authentication("Authorization header is missing".to_string()))?;

    let verification = token_service
        .verify(
            token,
            token_type,
            request.phone.as_deref(),
            request.account_id,
        )
        .await?;

    if verification.success() {
        Ok(ApiBody::message(verification.message()))
    } else {
        Err(AppError::Authentication(verification.message()))
    }
}

fn required<T>(value: Option<T>, message: &str) -> AppResult<T> {
    value.ok_or_else(|| AppError::MissingFields(message.to_string()))
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/send-otp", web::post().to(send_otp))
            .route("/verify-otp", web::post().to(verify_otp))
            .route("/verify-token", web::post().to(verify_token)),
    );
}
