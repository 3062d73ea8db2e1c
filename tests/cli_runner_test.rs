//! 执行器行为测试
//!
//! 用一个假的 shell 工具扮演外部 CLI，覆盖成功取回、半写退避、
//! 形状不符、进程失败和超时五条路径。只在 Unix 上运行。

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pdf_quiz_gen::{AppError, CliLocator, CliRunner, ResponseType, ToolOutput};

const QUESTIONS_JSON: &str = r#"[{"id":"q1","text":"假工具写回的题目","options":["A","B"],"correctAnswerIndex":0,"explanation":"测试用"}]"#;

/// 往目录里安装一个假工具脚本，返回配好的执行器和工作目录
fn install_tool(dir: &Path, name: &str, script: &str) -> CliRunner {
    let path = dir.join(name);
    std::fs::write(&path, script).expect("写脚本失败");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod 失败");
    let locator = CliLocator::with_probe_dirs(name, vec![dir.to_path_buf()]);
    CliRunner::new(Arc::new(locator))
}

fn work_dir(dir: &Path) -> PathBuf {
    let work = dir.join("work");
    std::fs::create_dir_all(&work).expect("创建工作目录失败");
    work
}

#[tokio::test]
async fn test_runner_retrieves_exchange_file_result() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = format!(
        "#!/bin/sh\ncat > /dev/null\nprintf '%s' '{}' > quiz_out.json\n",
        QUESTIONS_JSON
    );
    let runner = install_tool(dir.path(), "fake-quiz-tool", &script);
    let work = work_dir(dir.path());
    let output_target = work.join("quiz_out.json");

    let output = runner
        .run("出题指令", "test-model", &work, &output_target, ResponseType::JsonArray, 5_000)
        .await
        .expect("应当取回结果");

    match output {
        ToolOutput::Json(value) => {
            let array = value.as_array().expect("是数组");
            assert_eq!(array.len(), 1);
            assert_eq!(array[0]["id"], "q1");
        }
        ToolOutput::Text(_) => panic!("期望 JSON 结果"),
    }
    // 交换文件读取一次后即删除
    assert!(!output_target.exists());
}

#[tokio::test]
async fn test_runner_waits_out_partial_write() {
    let dir = tempfile::tempdir().expect("tempdir");
    // 先落半个 JSON，睡一秒再写完整内容
    let script = format!(
        "#!/bin/sh\ncat > /dev/null\nprintf '[' > quiz_out.json\nsleep 1\nprintf '%s' '{}' > quiz_out.json\n",
        QUESTIONS_JSON
    );
    let runner = install_tool(dir.path(), "fake-slow-writer", &script);
    let work = work_dir(dir.path());
    let output_target = work.join("quiz_out.json");

    let output = runner
        .run("出题指令", "test-model", &work, &output_target, ResponseType::JsonArray, 10_000)
        .await
        .expect("半写状态应当被等过去");
    assert!(matches!(output, ToolOutput::Json(_)));
}

#[tokio::test]
async fn test_runner_reports_wrong_shape() {
    let dir = tempfile::tempdir().expect("tempdir");
    // 期望数组，工具却写了对象
    let script = "#!/bin/sh\ncat > /dev/null\nprintf '%s' '{\"answer\":\"不是数组\"}' > quiz_out.json\n";
    let runner = install_tool(dir.path(), "fake-wrong-shape", script);
    let work = work_dir(dir.path());
    let output_target = work.join("quiz_out.json");

    let err = runner
        .run("出题指令", "test-model", &work, &output_target, ResponseType::JsonArray, 5_000)
        .await
        .expect_err("形状不符应当失败");
    match err {
        AppError::Execution(pdf_quiz_gen::error::ExecutionError::MalformedOutput {
            expected,
            preview,
        }) => {
            assert_eq!(expected, "json-array");
            // 内容只进截断后的摘录，不原样转发
            assert!(preview.chars().count() <= 203);
        }
        other => panic!("期望 MalformedOutput，得到 {}", other),
    }
    assert!(!output_target.exists());
}

#[tokio::test]
async fn test_runner_reports_process_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = "#!/bin/sh\ncat > /dev/null\necho '工具内部炸了' >&2\nexit 3\n";
    let runner = install_tool(dir.path(), "fake-crasher", script);
    let work = work_dir(dir.path());
    let output_target = work.join("quiz_out.json");

    let err = runner
        .run("出题指令", "test-model", &work, &output_target, ResponseType::JsonArray, 5_000)
        .await
        .expect_err("进程失败应当上报");
    match err {
        AppError::Execution(pdf_quiz_gen::error::ExecutionError::ProcessFailed { code, stderr }) => {
            assert_eq!(code, Some(3));
            assert!(stderr.contains("工具内部炸了"));
        }
        other => panic!("期望 ProcessFailed，得到 {}", other),
    }
}

#[tokio::test]
async fn test_runner_times_out_and_kills() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = "#!/bin/sh\ncat > /dev/null\nsleep 30\n";
    let runner = install_tool(dir.path(), "fake-hanger", script);
    let work = work_dir(dir.path());
    let output_target = work.join("quiz_out.json");

    let started = std::time::Instant::now();
    let err = runner
        .run("出题指令", "test-model", &work, &output_target, ResponseType::JsonArray, 1_200)
        .await
        .expect_err("应当超时");
    assert!(matches!(
        err,
        AppError::Execution(pdf_quiz_gen::error::ExecutionError::TimedOut { timeout_ms: 1_200 })
    ));
    // 超时后立刻返回，不等子进程睡满 30 秒
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
}

#[tokio::test]
async fn test_runner_json_object_response() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = "#!/bin/sh\ncat > /dev/null\nprintf '%s' '{\"answer\":\"回答正文\",\"suggestions\":[\"继续问\"]}' > answer.json\n";
    let runner = install_tool(dir.path(), "fake-assistant", script);
    let work = work_dir(dir.path());
    let output_target = work.join("answer.json");

    let output = runner
        .run("问答指令", "test-model", &work, &output_target, ResponseType::JsonObject, 5_000)
        .await
        .expect("应当取回回答");
    match output {
        ToolOutput::Json(value) => assert_eq!(value["answer"], "回答正文"),
        ToolOutput::Text(_) => panic!("期望 JSON 对象"),
    }
}
