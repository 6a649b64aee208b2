// 受注・在庫整合性エンジン
// ドメイン層・アプリケーション層・アダプター層のヘキサゴナル構成

pub mod adapter;
pub mod application;
pub mod domain;
