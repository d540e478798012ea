pub mod market;
pub mod smtp;
pub mod util;
pub mod yahoo_finance;

pub use market::MarketLoader;
pub use smtp::SmtpNotifier;
pub use yahoo_finance::YahooQuoteSource;
