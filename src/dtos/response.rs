use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// 所有接口共用的响应包裹：`{ "code": 200, "msg": "...", "data": ... }`。
///
/// `code` 与 HTTP 状态码保持一致；`data` 为空时不输出该字段。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    #[serde(skip)]
    status: StatusCode,
    pub code: u16,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, msg: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status,
            code: status.as_u16(),
            msg: msg.into(),
            data,
        }
    }

    /// 200 + 数据
    pub fn ok(data: T) -> Self {
        Self::new(StatusCode::OK, "success", Some(data))
    }

    /// 201 + 新建的资源
    pub fn created(msg: impl Into<String>, data: T) -> Self {
        Self::new(StatusCode::CREATED, msg, Some(data))
    }
}

impl ApiResponse<()> {
    /// 只有提示信息的 200 响应。
    pub fn message(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, msg, None)
    }

    pub fn error(status: StatusCode, msg: impl Into<String>) -> Self {
        Self::new(status, msg, None)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
