// ==========================================
// 银行流水导入管道 - 配置层
// ==========================================
// 职责: 运行配置管理,支持多级覆写
// 来源: 默认值 / JSON 配置文件 / 环境变量 / 命令行
// ==========================================

pub mod pipeline_config;

// 重导出核心配置
pub use pipeline_config::{
    env_keys, get_default_db_path, ConfigError, ConfigResult, PipelineConfig,
};
