use actix_web::web::Data;
use actix_web::{App, HttpServer};
use flexi_logger::{
    Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode,
};
use lendops_common::cache::local::LocalStore;
use lendops_common::cache::remote::RedisStore;
use lendops_common::cache::Cache;
use lendops_common::db::create_db_thread_pool;
use std::sync::Arc;

mod codes;
mod env;
mod handlers;
mod middleware;
mod services;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let mut port = 9000u16;

    let mut args = std::env::args();

    // Eat the first argument, which is the relative path to the executable
    args.next();

    while let Some(arg) = args.next() {
        match arg.to_lowercase().as_str() {
            "--port" => {
                let port_str = {
                    let next_arg = args.next();

                    match next_arg {
                        Some(s) => s,
                        None => {
                            eprintln!("ERROR: --port option specified but no port was given");
                            std::process::exit(1);
                        }
                    }
                };

                port = {
                    let port_result = port_str.parse::<u16>();

                    match port_result {
                        Ok(p) => p,
                        Err(_) => {
                            eprintln!("ERROR: Incorrect format for port. Integer expected");
                            std::process::exit(1);
                        }
                    }
                };

                continue;
            }
            a => {
                eprintln!("ERROR: Invalid argument: {}", &a);
                std::process::exit(1);
            }
        }
    }

    let base_addr = format!("0.0.0.0:{}", &port);

    // Forces the config to load so a bad environment fails here, not on the
    // first request
    let _ = &*env::CONF;

    codes::assert_disjoint();

    let _logger = Logger::try_with_str(&env::CONF.log_level)
        .expect("Invalid log level")
        .log_to_file(FileSpec::default().directory("./logs"))
        .rotate(
            Criterion::Age(Age::Day),
            Naming::Timestamps,
            Cleanup::KeepLogAndCompressedFiles(60, 365),
        )
        .cleanup_in_background_thread(true)
        .duplicate_to_stdout(Duplicate::All)
        .write_mode(WriteMode::Async)
        .format(|writer, now, record| {
            write!(
                writer,
                "{:5} | {} | {}:{} | {}",
                record.level(),
                now.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
                record.module_path().unwrap_or("<unknown>"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .use_utc()
        .start()
        .expect("Failed to start logger");

    let actix_workers = env::CONF.actix_worker_count;

    // To prevent resource starvation, max connections must be at least as
    // large as the number of actix workers
    let db_max_connections = if actix_workers > env::CONF.db_max_connections as usize {
        actix_workers as u32
    } else {
        env::CONF.db_max_connections
    };

    log::info!("Connecting to database...");

    let db_thread_pool = match create_db_thread_pool(
        &env::CONF.db_uri,
        db_max_connections,
        env::CONF.db_idle_timeout,
    ) {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("ERROR: Failed to connect to database: {e}");
            std::process::exit(1);
        }
    };

    log::info!("Successfully connected to database");

    let cache = match env::CONF.cache_backend {
        env::CacheBackend::Local => {
            log::info!("Using the in-process cache");
            Cache::new(Arc::new(LocalStore::new()), env::CONF.cache_ttl)
        }
        env::CacheBackend::Redis => {
            let redis_uri = env::CONF
                .redis_uri
                .as_deref()
                .expect("Redis URI is validated at config load");

            match RedisStore::connect(redis_uri) {
                Ok(store) => {
                    log::info!("Using the remote cache");
                    Cache::new(Arc::new(store), env::CONF.cache_ttl)
                }
                Err(e) => {
                    eprintln!("ERROR: Failed to connect to cache: {e}");
                    std::process::exit(1);
                }
            }
        }
    };

    if let Err(e) = std::fs::create_dir_all(&env::CONF.voucher_dir) {
        eprintln!("ERROR: Failed to create voucher directory: {e}");
        std::process::exit(1);
    }

    let db_thread_pool_data = Data::new(db_thread_pool);
    let cache_data = Data::new(cache);

    log::info!("Starting server at {base_addr} with {actix_workers} workers");

    HttpServer::new(move || {
        App::new()
            .app_data(db_thread_pool_data.clone())
            .app_data(cache_data.clone())
            .configure(services::api::configure)
    })
    .workers(actix_workers)
    .bind(base_addr)?
    .run()
    .await
}
