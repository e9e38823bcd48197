use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use price_matcher::batch::{self, BatchMatcher, CancelToken};
use price_matcher::cli::{Cli, Commands};
use price_matcher::config::Config;
use price_matcher::matcher::{MatchOptions, Matcher};
use price_matcher::normalizer::{numeric, Normalizer};
use price_matcher::report::MatchReport;
use price_matcher::search::{ElasticsearchIndex, InMemoryIndex, SearchIndex};
use price_matcher::similarity::{self, metrics, FieldComparator, Scorer};
use price_matcher::{loader, logging};
use price_matcher_common::Material;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let mut config =
        loaded.with_context(|| format!("設定ファイルの読み込みに失敗: {}", config_path.display()))?;

    match cli.command {
        Commands::Match {
            materials,
            catalog,
            output,
            threshold,
            max_results,
            concurrency,
            preset,
            synonyms,
            exact_threshold,
        } => {
            println!("🔎 price-matcher - 価格照合\n");

            if let Some(threshold) = threshold {
                config.matching.threshold = threshold.clamp(0.0, 100.0);
            }
            if let Some(max_results) = max_results {
                config.matching.max_results = max_results;
            }
            if let Some(concurrency) = concurrency {
                config.matching.concurrency = concurrency;
            }
            if preset.is_some() {
                config.synonyms.preset = preset;
            }
            if synonyms.is_some() {
                config.synonyms.file = synonyms;
            }

            // 1. 資材の読み込み
            println!("[1/3] 資材を読み込み中...");
            let material_list = loader::load_materials(&materials)
                .with_context(|| format!("資材ファイルの読み込みに失敗: {}", materials.display()))?;
            println!("✔ {}件の資材を検出\n", material_list.len());

            // 2. 検索インデックスの準備
            println!("[2/3] 検索インデックスを準備中...");
            let index = open_index(&config, catalog.as_deref())?;
            println!("✔ {} を使用\n", index.name());

            let synonym_table = config.synonyms.build().context("同義語辞書の構築に失敗")?;
            let matcher = BatchMatcher::with_caches(
                index,
                synonym_table,
                config.matching.normalize_cache,
                config.matching.score_cache,
            );

            // 3. 照合
            println!("[3/3] 照合中...");
            let progress = ProgressBar::new(material_list.len() as u64);
            progress.set_style(
                ProgressStyle::default_bar()
                    .template("  [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {wide_msg}")?
                    .progress_chars("█▉▊▋▌▍▎▏  "),
            );
            let on_progress = |done: usize, _total: usize, name: &str| {
                progress.set_position(done as u64);
                progress.set_message(name.to_string());
            };

            let report = matcher.match_all(
                &material_list,
                &config.matching.batch_options(),
                &on_progress,
                &CancelToken::new(),
            )?;
            progress.finish_and_clear();
            println!("✔ 照合完了\n");

            let output = output.unwrap_or_else(|| default_output(&materials));
            let match_report = MatchReport::from_batch(&report, &material_list);
            match_report
                .save(&output)
                .with_context(|| format!("結果の保存に失敗: {}", output.display()))?;
            println!("✔ 結果を保存: {}", output.display());

            if let Some(exact) = exact_threshold {
                let exact_path = output.with_file_name("exact_matches.json");
                let exact_results = batch::exact_matches(&report, exact);
                std::fs::write(&exact_path, serde_json::to_string_pretty(&exact_results)?)?;
                println!("✔ スコア{}以上の候補を保存: {}", exact, exact_path.display());
            }

            let (normalize_stats, score_stats) = matcher.cache_stats();
            tracing::debug!(
                normalize_entries = normalize_stats.entries,
                score_entries = score_stats.map(|s| s.entries).unwrap_or(0),
                "キャッシュ使用状況"
            );

            println!();
            print_statistics(&match_report);
            if !report.failures.is_empty() {
                println!("\n⚠ {}件の資材で照合に失敗:", report.failures.len());
                for failure in &report.failures {
                    println!("  - {} ({}): {}", failure.material_name, failure.material_id, failure.error);
                }
            }

            println!("\n✅ 照合完了");
        }

        Commands::Search { name, catalog, top, code, manufacturer } => {
            println!("🔎 price-matcher - 資材検索\n");

            let index = open_index(&config, catalog.as_deref())?;
            let synonym_table = config.synonyms.build().context("同義語辞書の構築に失敗")?;
            let normalizer = Arc::new(Normalizer::new(synonym_table, config.matching.normalize_cache));
            let matcher = Matcher::new(index, Scorer::new(FieldComparator::new(normalizer)));

            let mut material = Material::new("search", name.as_str());
            material.equipment_code = code;
            material.manufacturer = manufacturer;

            let options = MatchOptions {
                threshold: 0.0,
                max_results: top,
                search_limit: config.matching.search_limit.max(top),
            };
            let results = matcher.match_material(&material, &options)?.into_results();

            if results.is_empty() {
                println!("候補が見つかりませんでした: {}", name);
            } else {
                println!("{}件の候補:", results.len());
                for (rank, result) in results.iter().enumerate() {
                    let item = &result.price_item;
                    println!(
                        "  {:>2}. {:>5.1}点  {} [{}] {} {} ({})",
                        rank + 1,
                        result.overall_score,
                        item.name,
                        item.article().unwrap_or("-"),
                        item.price,
                        item.currency,
                        if item.supplier.is_empty() { "-" } else { item.supplier.as_str() },
                    );
                }
            }
        }

        Commands::Stats { input, details } => {
            let report = MatchReport::load(&input)
                .with_context(|| format!("照合結果の読み込みに失敗: {}", input.display()))?;
            print_statistics(&report);

            if details {
                println!("\n資材ごとの最良候補:");
                for summary in &report.summaries {
                    match &summary.best_match_name {
                        Some(name) => println!(
                            "  {} → {} ({:.1}点, {} {})",
                            summary.material_name,
                            name,
                            summary.best_match_score,
                            summary.best_match_price.unwrap_or_default(),
                            summary.best_match_currency.as_deref().unwrap_or_default(),
                        ),
                        None => println!("  {} → 候補なし", summary.material_name),
                    }
                }
            }
        }

        Commands::Compare { first, second, preset } => {
            if preset.is_some() {
                config.synonyms.preset = preset;
            }
            let normalizer = Arc::new(Normalizer::new(config.synonyms.build()?, 16));
            let comparator = FieldComparator::new(normalizer.clone());

            let a = normalizer.normalize(&first);
            let b = normalizer.normalize(&second);
            println!("正規化:");
            println!("  A: {}", a);
            println!("  B: {}", b);

            let tokens_a = numeric::extract_tokens(&first);
            let tokens_b = numeric::extract_tokens(&second);
            println!("数値トークン:");
            println!("  A: {}", join_tokens(&tokens_a));
            println!("  B: {}", join_tokens(&tokens_b));
            println!("  整合性: {:?}", numeric::compare_tokens(&tokens_a, &tokens_b));

            println!("類似度:");
            println!("  ratio:           {:.1}", metrics::ratio(&a, &b));
            println!("  token_sort:      {:.1}", metrics::token_sort_ratio(&a, &b));
            println!("  token_set:       {:.1}", metrics::token_set_ratio(&a, &b));
            println!("  テキスト:        {:.1}", comparator.text_similarity(&first, &second));
            println!("  コードとして:    {:.1}", similarity::code_similarity(&first, &second));
            println!("  メーカーとして:  {:.1}", similarity::brand_similarity(&first, &second));
        }

        Commands::Check => {
            let es = ElasticsearchIndex::new(config.elasticsearch.clone())?;
            match es.ping() {
                Ok(()) => println!(
                    "✔ Elasticsearchに接続できました: {} (index: {})",
                    es.config().url,
                    es.config().index
                ),
                Err(e) => {
                    println!("✖ 接続できません: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Config { show, init } => {
            if init {
                config.save(&config_path)?;
                println!("✔ 設定を保存しました: {}", config_path.display());
            }

            if show || !init {
                println!("設定 ({}):", config_path.display());
                println!("  Elasticsearch: {} (index: {})", config.elasticsearch.url, config.elasticsearch.index);
                println!(
                    "  認証: {}",
                    if config.elasticsearch.username.is_some() { "設定済み" } else { "未設定" }
                );
                println!("  閾値: {}", config.matching.threshold);
                println!("  最大候補数: {}", config.matching.max_results);
                println!("  並列数: {}", config.matching.concurrency);
                println!("  検索件数: {}", config.matching.search_limit);
                println!(
                    "  同義語: {}{}",
                    config.synonyms.preset.as_deref().unwrap_or("なし"),
                    config
                        .synonyms
                        .file
                        .as_ref()
                        .map(|p| format!(" + {}", p.display()))
                        .unwrap_or_default()
                );
            }
        }
    }

    Ok(())
}

/// 価格表ファイルがあればメモリ内インデックス、なければElasticsearch
fn open_index(config: &Config, catalog: Option<&Path>) -> Result<Arc<dyn SearchIndex>> {
    match catalog {
        Some(path) => {
            let items = loader::load_price_items(path)
                .with_context(|| format!("価格表の読み込みに失敗: {}", path.display()))?;
            println!("  価格表: {}件", items.len());
            Ok(Arc::new(InMemoryIndex::new(items)))
        }
        None => {
            let es = ElasticsearchIndex::new(config.elasticsearch.clone())?;
            es.ping()
                .with_context(|| format!("Elasticsearchに接続できません: {}", config.elasticsearch.url))?;
            Ok(Arc::new(es))
        }
    }
}

fn default_output(materials: &Path) -> PathBuf {
    materials
        .parent()
        .unwrap_or(Path::new("."))
        .join("match_result.json")
}

fn join_tokens(tokens: &std::collections::BTreeSet<numeric::NumericToken>) -> String {
    if tokens.is_empty() {
        return "-".to_string();
    }
    tokens.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
}

fn print_statistics(report: &MatchReport) {
    let stats = &report.statistics;
    println!("統計:");
    if !report.generated_at.is_empty() {
        println!("  作成日時: {}", report.generated_at);
    }
    println!("  資材数: {}", stats.total_materials);
    println!("  候補あり: {} ({:.1}%)", stats.materials_with_matches, stats.match_rate);
    println!("  候補なし: {}", stats.materials_without_matches);
    println!(
        "  候補総数: {} (資材あたり {:.2})",
        stats.total_matches, stats.average_matches_per_material
    );
    if stats.total_matches > 0 {
        println!(
            "  スコア: 平均 {:.1} / 最高 {:.1} / 最低 {:.1}",
            stats.average_score, stats.max_score, stats.min_score
        );
    }
    if report.cancelled {
        println!("  ※ 途中でキャンセルされました");
    }
}
