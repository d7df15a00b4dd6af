/// 日志工具模块
///
/// 提供日志初始化和批量任务输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// `RUST_LOG` 优先；否则默认 `info`，开启 verbose 时为 `debug`。
/// 重复调用是安全的（测试中可能多次初始化）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,document_ingest={default_level},docingest={default_level}"
        ))
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录批量分析开始
///
/// # 参数
/// - `total`: 待分析的文档数
/// - `skipped`: 因状态不符被排除的文档数
pub fn log_batch_start(total: usize, skipped: usize) {
    info!("{}", "=".repeat(60));
    info!("📦 开始批量分析: {} 个 pending 文档", total);
    if skipped > 0 {
        info!("⏭️ 跳过 {} 个非 pending 文档", skipped);
    }
    info!("{}", "=".repeat(60));
}

/// 打印批量分析最终统计
///
/// # 参数
/// - `completed`: 成功数量
/// - `failed`: 失败数量
/// - `total`: 总数
pub fn print_batch_stats(completed: usize, failed: usize, total: usize) {
    info!("{}", "=".repeat(60));
    info!("📊 批量分析完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("✅ 成功: {}/{}", completed, total);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_text("作文报告", 2), "作文...");
        assert_eq!(truncate_text("Essay", 10), "Essay");
    }
}
