//! 外部工具的登录状态管理
//!
//! 工具的账号体系归工具自己管，这里只是薄薄的一层转发：登录是交互式
//! 的，派生出去后不等它结束；状态查询和退出是短命令，带超时直接读
//! 标准输出。小体积输出走直接通道没有问题，文件交接只用于大的结构化
//! 结果。

use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;
use tracing::{info, warn};

use crate::services::tool_discovery::CliLocator;

/// 短命令（状态查询/退出）的超时
const AUTH_COMMAND_TIMEOUT_MS: u64 = 10_000;

/// 登录/退出操作的结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthActionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthActionResult {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn fail(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// 登录状态
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

/// 派生工具的交互式登录流程，不等待它结束
pub async fn open_login(locator: &CliLocator) -> AuthActionResult {
    let cli_path = match locator.resolve() {
        Ok(path) => path,
        Err(e) => return AuthActionResult::fail(e),
    };
    match Command::new(&cli_path)
        .arg("login")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(mut child) => {
            info!("🔑 已打开登录流程");
            tokio::spawn(async move {
                let _ = child.wait().await;
            });
            AuthActionResult::ok()
        }
        Err(e) => {
            warn!("打开登录流程失败: {}", e);
            AuthActionResult::fail(format!("打开登录流程失败: {}", e))
        }
    }
}

/// 查询登录状态
///
/// 工具约定：`auth status` 成功退出并在标准输出打印账号标识，
/// 非零退出视为未登录。
pub async fn check_auth(locator: &CliLocator) -> AuthStatus {
    let cli_path = match locator.resolve() {
        Ok(path) => path,
        Err(_) => {
            return AuthStatus {
                authenticated: false,
                account: None,
            };
        }
    };

    let output = tokio::time::timeout(
        Duration::from_millis(AUTH_COMMAND_TIMEOUT_MS),
        Command::new(&cli_path)
            .arg("auth")
            .arg("status")
            .stdin(Stdio::null())
            .output(),
    )
    .await;

    match output {
        Ok(Ok(output)) if output.status.success() => {
            let account = String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(str::to_string);
            AuthStatus {
                authenticated: account.is_some(),
                account,
            }
        }
        Ok(Ok(_)) => AuthStatus {
            authenticated: false,
            account: None,
        },
        Ok(Err(e)) => {
            warn!("查询登录状态失败: {}", e);
            AuthStatus {
                authenticated: false,
                account: None,
            }
        }
        Err(_) => {
            warn!("查询登录状态超时");
            AuthStatus {
                authenticated: false,
                account: None,
            }
        }
    }
}

/// 退出登录
pub async fn logout(locator: &CliLocator) -> AuthActionResult {
    let cli_path = match locator.resolve() {
        Ok(path) => path,
        Err(e) => return AuthActionResult::fail(e),
    };

    let output = tokio::time::timeout(
        Duration::from_millis(AUTH_COMMAND_TIMEOUT_MS),
        Command::new(&cli_path)
            .arg("logout")
            .stdin(Stdio::null())
            .output(),
    )
    .await;

    match output {
        Ok(Ok(output)) if output.status.success() => {
            info!("👋 已退出登录");
            AuthActionResult::ok()
        }
        Ok(Ok(output)) => AuthActionResult::fail(format!(
            "退出登录失败（退出码 {:?}）",
            output.status.code()
        )),
        Ok(Err(e)) => AuthActionResult::fail(format!("退出登录失败: {}", e)),
        Err(_) => AuthActionResult::fail("退出登录超时"),
    }
}
