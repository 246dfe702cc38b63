use crate::{storage::TransactionData, utils::string_or_number};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReq {
    pub id_pelanggan: String,
    pub id_server:    String,
    pub id_sv:        String,
    pub kode_produk:  String,
    #[serde(deserialize_with = "string_or_number")]
    pub nominal:      String,
    #[serde(deserialize_with = "string_or_number")]
    pub harga:        String,
    pub pembayaran:   String,
    #[serde(default)]
    pub const_trx:    String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResp {
    #[serde(flatten)]
    pub transaction:     TransactionData,
    pub qr_data:         String,        // PAYMENT-<trx>-<harga>
    pub formatted_price: String,
}
