use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use document_ingest::app::UploadOptions;
use document_ingest::utils::logging;
use document_ingest::{App, BatchOutcome, Config, DocumentId, StudentId};

#[derive(Parser)]
#[command(name = "docingest", about = "上传学生文档并触发分析")]
struct Cli {
    /// TOML 配置文件；未指定时只读取环境变量
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 显示详细日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 上传一个 PDF / DOCX / TXT 文件
    Upload {
        student_id: StudentId,
        file: PathBuf,
        /// 文档标题
        #[arg(long)]
        title: String,
        /// 科目
        #[arg(long)]
        subject: Option<String>,
        /// 注册后立即触发分析
        #[arg(long)]
        analyze: bool,
        /// 触发分析后等待终态
        #[arg(long, requires = "analyze")]
        watch: bool,
    },
    /// 触发单个文档的分析
    Analyze {
        id: String,
        #[arg(long)]
        watch: bool,
    },
    /// 查询文档当前状态
    Status { id: String },
    /// 轮询文档状态直到 completed / failed
    Watch { id: String },
    /// 对学生的所有 pending 文档批量触发分析
    BulkAnalyze { student_id: StudentId },
    /// 列出学生的文档
    List { student_id: StudentId },
    /// 删除文档
    Delete { id: String },
    /// 获取文档原件的下载地址
    DownloadUrl { id: String },
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("序列化输出失败")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    // 初始化日志
    logging::init(cli.verbose || config.verbose_logging);

    let app = App::initialize(config)?;

    match cli.command {
        Commands::Upload {
            student_id,
            file,
            title,
            subject,
            analyze,
            watch,
        } => {
            let options = UploadOptions {
                student_id,
                title,
                subject,
                analyze,
                watch,
            };
            print_json(&app.upload(&file, options).await?)?;
        }
        Commands::Analyze { id, watch } => {
            print_json(&app.analyze(&DocumentId::new(id), watch).await?)?;
        }
        Commands::Status { id } => {
            print_json(&app.status(&DocumentId::new(id)).await?)?;
        }
        Commands::Watch { id } => {
            print_json(&app.watch(&DocumentId::new(id)).await?)?;
        }
        Commands::BulkAnalyze { student_id } => match app.bulk_analyze(student_id).await? {
            BatchOutcome::NothingToDo => println!("No pending documents to analyze"),
            BatchOutcome::Ran(report) => {
                println!(
                    "Analysis started for {} of {} documents ({} failed)",
                    report.completed, report.total, report.failed
                );
                for error in &report.errors {
                    println!("  - {}", error);
                }
            }
        },
        Commands::List { student_id } => {
            print_json(&app.list(student_id).await?)?;
        }
        Commands::Delete { id } => {
            print_json(&app.delete(&DocumentId::new(id)).await?)?;
        }
        Commands::DownloadUrl { id } => {
            print_json(&app.download_url(&DocumentId::new(id)).await?)?;
        }
    }

    Ok(())
}
