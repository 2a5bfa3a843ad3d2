pub mod chapa_client;
