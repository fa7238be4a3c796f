mod cli;

use crate::cli::{CacheBackendArg, Command, LogFormatArg, StorageBackendArg, CLI};
use clap::Parser;
use linkfold_cache::{BloomMembershipFilter, MokaUrlCache, RedisUrlCache};
use linkfold_core::{MembershipFilter, Repository, UrlCache};
use linkfold_generator::{DigestGenerator, Generator};
use linkfold_pipeline::{PipelineConfig, ResolutionPipeline};
use linkfold_storage::{InMemoryRepository, MySqlRepository};
use tracing::info;
use tracing_subscriber::EnvFilter;

type Error = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    info!(
        storage_backend = %config.storage,
        cache_backend = %config.cache,
        code_width = config.code_width,
        filter_capacity = config.filter_capacity,
        "starting linkfold"
    );

    let filter = BloomMembershipFilter::new(config.filter_config())?;
    let generator = DigestGenerator::new(config.code_format()?);
    let pipeline_config = config.pipeline_config();

    match config.storage {
        StorageBackendArg::InMemory => {
            with_cache(&config, InMemoryRepository::new(), filter, generator, pipeline_config)
                .await
        }
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .as_deref()
                .ok_or("mysql dsn is required when storage backend is mysql")?;
            let repository = MySqlRepository::connect(mysql_dsn).await?;
            repository.ensure_schema().await?;

            let result = with_cache(
                &config,
                repository.clone(),
                filter,
                generator,
                pipeline_config,
            )
            .await;
            repository.close().await;
            result
        }
    }
}

fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormatArg::Text => subscriber.init(),
        LogFormatArg::Json => subscriber.json().init(),
    }
}

async fn with_cache<R: Repository>(
    config: &CLI,
    repository: R,
    filter: BloomMembershipFilter,
    generator: DigestGenerator,
    pipeline_config: PipelineConfig,
) -> Result<(), Error> {
    match config.cache {
        CacheBackendArg::Moka => {
            run(config, repository, MokaUrlCache::new(), filter, generator, pipeline_config).await
        }
        CacheBackendArg::Redis => {
            let redis_url = config
                .redis_url
                .as_deref()
                .ok_or("redis url is required when cache backend is redis")?;
            let cache = RedisUrlCache::connect(redis_url).await?;
            run(config, repository, cache, filter, generator, pipeline_config).await
        }
    }
}

async fn run<R, C, F, G>(
    config: &CLI,
    repository: R,
    cache: C,
    filter: F,
    generator: G,
    pipeline_config: PipelineConfig,
) -> Result<(), Error>
where
    R: Repository,
    C: UrlCache,
    F: MembershipFilter,
    G: Generator,
{
    let pipeline =
        ResolutionPipeline::bootstrap(repository, cache, filter, generator, pipeline_config)
            .await?;

    match &config.command {
        Command::Shorten { urls } => {
            for url in urls {
                let code = pipeline.create(url).await?;
                match config.base_url.as_deref() {
                    Some(base) => println!("{}\t{url}", code.to_url(base)),
                    None => println!("{code}\t{url}"),
                }
            }
        }
        Command::Resolve { codes } => {
            for code in codes {
                match pipeline.resolve(code).await {
                    Ok(target) => println!("{code}\t{target}"),
                    Err(e) if e.is_not_found() => eprintln!("{code}\tnot found"),
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Command::Stats => {
            let stats = pipeline.stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
