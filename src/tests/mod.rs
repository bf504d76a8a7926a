
mod export_tests;
mod notes_tests;
mod price_tests;
mod query_tests;
mod ranking_tests;
mod rpc_tests;
mod transaction_tests;
