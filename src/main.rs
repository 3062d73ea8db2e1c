use std::path::PathBuf;

use anyhow::{bail, Result};

use pdf_quiz_gen::utils::logging;
use pdf_quiz_gen::{
    AppError, Config, GenerationMode, QuizBackend, QuizPhase, QuizSession,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::from_env();

    // 解析参数：--demo 走离线演示，否则是 PDF 的绝对路径
    let arg = std::env::args().nth(1);
    let Some(arg) = arg else {
        bail!("用法: pdf_quiz_gen <PDF绝对路径> | --demo");
    };

    let backend = QuizBackend::new(config.clone());
    let settings = backend.get_settings().await;
    let mut session = QuizSession::new(settings, config.language.clone());

    // 发出生成请求
    let (ticket, request) = if arg == "--demo" {
        session.start(GenerationMode::Demo)?
    } else {
        session.select_pdf(PathBuf::from(&arg))?;
        session.start(GenerationMode::Initial)?
    };

    // 驱动编排层并把结果喂回状态机
    let response = backend.generate(&request).await;
    let outcome = if response.success {
        match response.data {
            Some(questions) => Ok(questions),
            None => Err(AppError::Other("响应缺少题目数据".to_string())),
        }
    } else {
        Err(AppError::Other(
            response.error.unwrap_or_else(|| "未知错误".to_string()),
        ))
    };
    session.apply_generation(ticket, outcome);

    if session.phase() != QuizPhase::Ready {
        bail!(
            "生成失败: {}",
            session.last_error().unwrap_or("未知错误")
        );
    }

    // 输出整套题目
    let quiz = session
        .quiz()
        .ok_or_else(|| anyhow::anyhow!("就绪状态下没有测验数据"))?;
    println!("{}", serde_json::to_string_pretty(&quiz.questions)?);

    Ok(())
}
