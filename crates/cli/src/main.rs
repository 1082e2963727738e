use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use wealthwise_core::config::AppConfig;
use wealthwise_core::dates;
use wealthwise_core::errors::CoreError;
use wealthwise_core::models::dividend::DividendInput;
use wealthwise_core::models::metal::{Karat, Metal, MetalTradeInput, PriceCurrency};
use wealthwise_core::models::price::RefreshReport;
use wealthwise_core::models::trade::TradeInput;
use wealthwise_core::WealthWise;

#[derive(Parser)]
#[command(name = "wealthwise", version, about = "Track PSX stocks, dividends and precious metals")]
struct Cli {
    /// Portfolio owner; selects `<data_dir>/<user>_portfolio.db`
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the portfolio database (if missing) and show where it lives
    Init,
    /// Record the buy trades of one broker memo
    AddTrade {
        /// Memo number; left blank it is stored as UNKNOWN
        #[arg(short, long, default_value = "")]
        memo: String,
        /// Trade date (defaults to today)
        #[arg(short, long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        /// STOCK,QUANTITY,RATE[,COMMISSION,CDC,SALES_TAX]; repeat for each trade on the memo
        #[arg(short, long = "trade", required = true, value_parser = parse_trade_arg)]
        trades: Vec<TradeSpec>,
    },
    /// Record a precious metal purchase
    AddMetal {
        #[arg(long)]
        metal: String,
        /// Weight in grams
        #[arg(long)]
        weight: f64,
        #[arg(long, default_value_t = 24)]
        karat: u8,
        /// Price per gram
        #[arg(long)]
        price: f64,
        #[arg(long, default_value = "PKR")]
        currency: String,
        #[arg(short, long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },
    /// Record a dividend warrant
    AddDividend {
        #[arg(short, long)]
        warrant: String,
        #[arg(short, long)]
        stock: String,
        /// Dividend per share
        #[arg(short, long)]
        rate: f64,
        /// Number of securities held
        #[arg(short = 'n', long)]
        securities: i64,
        /// Withholding tax percent (defaults to the configured rate)
        #[arg(short, long)]
        tax: Option<f64>,
        /// Payment date (defaults to today)
        #[arg(short, long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },
    /// Sell shares of a held stock
    Sell {
        #[arg(short, long)]
        stock: String,
        #[arg(short, long)]
        quantity: i64,
        #[arg(short, long)]
        rate: f64,
        /// Capital gains tax percent (defaults to the configured rate)
        #[arg(short, long)]
        cgt: Option<f64>,
        /// Show the sale without recording it
        #[arg(long)]
        preview: bool,
    },
    /// List buy trades
    Trades,
    /// List sales
    Sales,
    /// List dividends
    Dividends,
    /// List metal purchases and holdings
    MetalTrades,
    /// Delete the trades of a stock under a memo
    DeleteTrade {
        #[arg(short, long)]
        memo: String,
        #[arg(short, long)]
        stock: String,
    },
    /// Delete a dividend by warrant number
    DeleteDividend {
        #[arg(short, long)]
        warrant: String,
    },
    /// Current holdings with average cost and cached market value
    Positions,
    /// Realized profit and loss per stock
    Pl,
    /// Dividend income per stock
    DividendIncome,
    /// Full portfolio summary
    Summary,
    /// Current price of a PSX stock, or its close on a past date
    Price {
        symbol: String,
        #[arg(short, long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },
    /// Refresh prices of every held stock
    RefreshPrices,
    /// Refresh gold, silver, platinum and palladium prices
    RefreshMetals {
        /// Refetch even if already updated today
        #[arg(short, long)]
        force: bool,
    },
    /// Show stored metal prices, or provider prices on a past date
    Metals {
        #[arg(short, long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },
    /// Exchange rate between two currencies
    Rate {
        #[arg(default_value = "USD")]
        base: String,
        #[arg(default_value = "PKR")]
        target: String,
        #[arg(short, long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },
    /// Export trades or dividends for backup
    Export {
        #[arg(value_enum)]
        what: ExportKind,
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportKind {
    Trades,
    Dividends,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Json,
    Csv,
}

#[derive(Clone, Debug)]
struct TradeSpec {
    stock: String,
    quantity: i64,
    rate: f64,
    commission: f64,
    cdc_charges: f64,
    sales_tax: f64,
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    dates::parse_date(s).ok_or_else(|| format!("unrecognized date '{s}'"))
}

fn parse_trade_arg(s: &str) -> Result<TradeSpec, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 6 {
        return Err("expected STOCK,QUANTITY,RATE or STOCK,QUANTITY,RATE,COMMISSION,CDC,SALES_TAX".into());
    }
    let num = |i: usize, name: &str| -> Result<f64, String> {
        parts
            .get(i)
            .map_or(Ok(0.0), |v| v.parse::<f64>().map_err(|e| format!("{name}: {e}")))
    };
    Ok(TradeSpec {
        stock: parts[0].to_string(),
        quantity: parts[1]
            .parse()
            .map_err(|e| format!("quantity: {e}"))?,
        rate: num(2, "rate")?,
        commission: num(3, "commission")?,
        cdc_charges: num(4, "cdc")?,
        sales_tax: num(5, "sales tax")?,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::debug!("command failed: {e:?}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CoreError> {
    let config = AppConfig::from_env();
    let path = config.db_path_for(cli.user.as_deref());
    let default_cgt = config.default_cgt_pct;
    let default_tax = config.default_dividend_tax_pct;
    let app = WealthWise::open_at(&path, config)?;

    match cli.command {
        Command::Init => println!("Portfolio database ready at {}", path.display()),

        Command::AddTrade { memo, date, trades } => {
            let date = date.unwrap_or_else(dates::today);
            let inputs: Vec<TradeInput> = trades
                .into_iter()
                .map(|t| {
                    TradeInput::new(date, t.stock, t.quantity, t.rate).with_charges(
                        t.commission,
                        t.cdc_charges,
                        t.sales_tax,
                    )
                })
                .collect();
            app.record_trades(&memo, &inputs)?;
            let grand_total: f64 = inputs.iter().map(TradeInput::total_amount).sum();
            println!("Saved {} trade(s). Grand total: Rs. {grand_total:.2}", inputs.len());
        }

        Command::AddMetal { metal, weight, karat, price, currency, date } => {
            let input = MetalTradeInput {
                date: date.unwrap_or_else(dates::today),
                metal: metal.parse::<Metal>()?,
                weight,
                karat: Some(Karat::new(karat)?),
                price_per_gram: price,
                currency: currency.parse::<PriceCurrency>()?,
            };
            let trade = app.record_metal_trade(&input)?;
            println!(
                "Saved {} ({}K): {} g at PKR {:.2}/g, total PKR {:.2}",
                trade.metal, karat, trade.weight, trade.purchase_price, trade.total_cost
            );
        }

        Command::AddDividend { warrant, stock, rate, securities, tax, date } => {
            let input = DividendInput {
                warrant_no: warrant,
                payment_date: date.unwrap_or_else(dates::today),
                stock_name: stock,
                rate_per_security: rate,
                number_of_securities: securities,
                tax_pct: tax.unwrap_or(default_tax),
            };
            let d = app.record_dividend(&input)?;
            println!(
                "Saved warrant {}: gross Rs. {:.2}, tax Rs. {:.2}, paid Rs. {:.2}",
                d.warrant_no, d.amount_of_dividend, d.tax_deducted, d.amount_paid
            );
        }

        Command::Sell { stock, quantity, rate, cgt, preview } => {
            let cgt = cgt.unwrap_or(default_cgt);
            if preview {
                let q = app.quote_sale(&stock, quantity, rate, cgt)?;
                println!("Sale amount:  Rs. {:.2}", q.sale_amount);
                println!("CGT ({:.1}%): Rs. {:.2}", q.cgt_percentage, q.cgt_amount);
                println!("Net amount:   Rs. {:.2}", q.net_amount);
                println!(
                    "{} per share: Rs. {:.2} ({:.2}%), total Rs. {:.2}",
                    if q.is_profit() { "Profit" } else { "Loss" },
                    q.profit_per_share.abs(),
                    q.profit_pct,
                    q.total_profit
                );
            } else {
                let r = app.sell_stock(&stock, quantity, rate, cgt)?;
                println!(
                    "Sold {} {} at Rs. {:.2} (memo {}). Net Rs. {:.2}. Remaining {} shares worth Rs. {:.2}",
                    r.sale.quantity,
                    r.sale.stock,
                    r.sale.rate,
                    r.sale.memo_number,
                    r.sale.net_amount,
                    r.remaining_shares,
                    r.remaining_value
                );
            }
        }

        Command::Trades => {
            println!(
                "{:<10}  {:<12}  {:<10}  {:>8}  {:>10}  {:>12}",
                "Date", "Memo", "Stock", "Qty", "Rate", "Total"
            );
            for t in app.list_trades()? {
                println!(
                    "{:<10}  {:<12}  {:<10}  {:>8}  {:>10.2}  {:>12.2}",
                    t.date, t.memo_number, t.stock, t.quantity, t.rate, t.total_amount
                );
            }
        }

        Command::Sales => {
            println!(
                "{:<10}  {:<18}  {:<10}  {:>8}  {:>10}  {:>10}  {:>12}",
                "Date", "Memo", "Stock", "Qty", "Rate", "CGT", "Net"
            );
            for s in app.list_sales()? {
                println!(
                    "{:<10}  {:<18}  {:<10}  {:>8}  {:>10.2}  {:>10.2}  {:>12.2}",
                    s.sell_date, s.memo_number, s.stock, s.quantity, s.rate, s.cgt_amount, s.net_amount
                );
            }
        }

        Command::Dividends => {
            println!(
                "{:<12}  {:<10}  {:<10}  {:>8}  {:>8}  {:>10}  {:>10}",
                "Warrant", "Date", "Stock", "Rate", "Shares", "Tax", "Paid"
            );
            for d in app.list_dividends()? {
                println!(
                    "{:<12}  {:<10}  {:<10}  {:>8.2}  {:>8}  {:>10.2}  {:>10.2}",
                    d.warrant_no,
                    d.payment_date,
                    d.stock_name,
                    d.rate_per_security,
                    d.number_of_securities,
                    d.tax_deducted,
                    d.amount_paid
                );
            }
        }

        Command::MetalTrades => {
            println!(
                "{:<10}  {:<10}  {:>6}  {:>10}  {:>12}  {:>14}",
                "Date", "Metal", "Karat", "Weight(g)", "PKR/g", "Total"
            );
            for t in app.list_metal_trades()? {
                println!(
                    "{:<10}  {:<10}  {:>6}  {:>10.3}  {:>12.2}  {:>14.2}",
                    t.date,
                    t.metal,
                    t.karat.map(|k| format!("{k}K")).unwrap_or_default(),
                    t.weight,
                    t.purchase_price,
                    t.total_cost
                );
            }
            println!();
            for h in app.metal_holdings()? {
                let karat = h.karat.map(|k| format!(" {k}K")).unwrap_or_default();
                match (h.current_value, h.gain_loss) {
                    (Some(value), Some(gain)) => println!(
                        "{}{karat}: {:.3} g, cost PKR {:.2}, value PKR {value:.2}, gain PKR {gain:.2}",
                        h.metal, h.total_weight, h.total_cost
                    ),
                    _ => println!(
                        "{}{karat}: {:.3} g, cost PKR {:.2}, no stored price",
                        h.metal, h.total_weight, h.total_cost
                    ),
                }
            }
        }

        Command::DeleteTrade { memo, stock } => {
            let n = app.delete_trade(&memo, &stock)?;
            println!("Deleted {n} trade(s)");
        }

        Command::DeleteDividend { warrant } => {
            app.delete_dividend(&warrant)?;
            println!("Deleted dividend warrant {warrant}");
        }

        Command::Positions => print_positions(&app)?,

        Command::Pl => {
            println!(
                "{:<10}  {:>8}  {:>14}  {:>14}  {:>10}  {:>12}",
                "Stock", "Sold", "Buy value", "Sell value", "Tax", "Net P/L"
            );
            for r in app.realized_pl()? {
                println!(
                    "{:<10}  {:>8}  {:>14.2}  {:>14.2}  {:>10.2}  {:>12.2}",
                    r.stock, r.total_sold, r.total_buy_value, r.total_sell_value, r.total_tax, r.net_pl
                );
            }
        }

        Command::DividendIncome => {
            println!(
                "{:<10}  {:>12}  {:>10}  {:>12}  {:>8}",
                "Stock", "Gross", "Tax", "Net", "Payments"
            );
            for d in app.dividend_income()? {
                println!(
                    "{:<10}  {:>12.2}  {:>10.2}  {:>12.2}  {:>8}",
                    d.stock, d.total_dividend, d.total_tax, d.net_amount, d.num_payments
                );
            }
        }

        Command::Summary => {
            let summary = app.portfolio_summary()?;
            print_positions(&app)?;
            println!();
            for slice in &summary.distribution {
                println!("{:<10}  {:>6.2}%", slice.stock, slice.percentage);
            }
            println!();
            println!("Portfolio value (at cost): Rs. {:.2}", summary.portfolio_value);
            println!("Total investment:          Rs. {:.2}", summary.total_investment);
            println!("Realized P/L:              Rs. {:.2}", summary.performance.total_realized_pl);
            println!("Net dividend income:       Rs. {:.2}", summary.performance.net_dividend_income);
            println!("Total return:              Rs. {:.2}", summary.performance.total_return);
        }

        Command::Price { symbol, date: None } => {
            let quote = app.get_stock_price(&symbol).await?;
            println!("{}: Rs. {:.2} ({})", quote.symbol, quote.price, quote.source);
        }

        Command::Price { symbol, date: Some(date) } => {
            let price = app.stock_price_on(&symbol, date).await?;
            println!("{} on {date}: Rs. {price:.2}", symbol.trim().to_uppercase());
        }

        Command::RefreshPrices => print_report(&app.refresh_stock_prices().await?),

        Command::RefreshMetals { force } => print_report(&app.refresh_metal_prices(force).await?),

        Command::Metals { date: Some(date) } => {
            for metal in Metal::ALL {
                match app.metal_price_on(metal, date).await {
                    Ok(usd) => println!("{} on {date}: USD {usd:.2} /g (24K)", metal.name()),
                    Err(e) => println!("{} on {date}: {e}", metal.name()),
                }
            }
        }

        Command::Metals { date: None } => {
            for prices in app.latest_metal_prices()? {
                let name = Metal::from_symbol(&prices.metal)
                    .map(|m| m.name().to_string())
                    .unwrap_or_else(|| prices.metal.clone());
                println!(
                    "{name} (updated {})",
                    prices.last_updated.as_deref().unwrap_or("never")
                );
                for (karat, price) in &prices.price_gram {
                    println!("  {karat:>2}K  PKR {price:>12.2} /g");
                }
            }
        }

        Command::Rate { base, target, date } => {
            let rate = match date {
                Some(date) => app.exchange_rate_on(&base, &target, date).await?,
                None => app.exchange_rate(&base, &target).await?,
            };
            println!("1 {} = {rate:.4} {}", base.to_uppercase(), target.to_uppercase());
        }

        Command::Export { what, format, output } => {
            let text = match (what, format) {
                (ExportKind::Trades, ExportFormat::Json) => app.export_trades_to_json()?,
                (ExportKind::Trades, ExportFormat::Csv) => app.export_trades_to_csv()?,
                (ExportKind::Dividends, ExportFormat::Json) => app.export_dividends_to_json()?,
                (ExportKind::Dividends, ExportFormat::Csv) => {
                    return Err(CoreError::ValidationError(
                        "Dividends can only be exported as JSON".into(),
                    ))
                }
            };
            match output {
                Some(file) => {
                    std::fs::write(&file, text)?;
                    println!("Exported to {}", file.display());
                }
                None => print!("{text}"),
            }
        }
    }

    Ok(())
}

fn print_positions(app: &WealthWise) -> Result<(), CoreError> {
    println!(
        "{:<10}  {:>8}  {:>10}  {:>14}  {:>10}  {:>14}",
        "Stock", "Shares", "Avg price", "Value (cost)", "Market", "Unrealized"
    );
    for p in app.positions()? {
        println!(
            "{:<10}  {:>8}  {:>10.2}  {:>14.2}  {:>10}  {:>14}",
            p.stock,
            p.remaining,
            p.avg_buy_price,
            p.current_value,
            p.market_price.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".into()),
            p.unrealized_pl.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".into()),
        );
    }
    Ok(())
}

fn print_report(report: &RefreshReport) {
    for symbol in &report.refreshed {
        println!("updated  {symbol}");
    }
    for symbol in &report.skipped {
        println!("current  {symbol}");
    }
    for (symbol, reason) in &report.failed {
        println!("failed   {symbol}: {reason}");
    }
}
