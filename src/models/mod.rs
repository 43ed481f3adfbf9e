pub mod bot;
pub mod order;
pub mod token;

// Re-export commonly used types
pub use bot::{BotSession, BotState};
pub use order::{Order, OrderOrigin, OrderSide, OrderStatus, TradeIntent};
pub use token::{PriceSnapshot, TokenBalance};
