use crate::domain::model::{CartId, Money, OrganizationId};
use crate::domain::port::{PaymentError, PaymentGateway, PaymentHandle};
use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// 外部の決済プロバイダーを呼ばないゲートウェイ
/// 開発環境とテスト用に `pi_{cart_id}_secret_{random}` 形式のハンドルを返す
pub struct StubPaymentGateway;

impl StubPaymentGateway {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StubPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for StubPaymentGateway {
    async fn create_payment(
        &self,
        _organization_id: OrganizationId,
        cart_id: CartId,
        amount: Money,
    ) -> Result<PaymentHandle, PaymentError> {
        if amount.amount() <= 0 {
            return Err(PaymentError::Rejected(format!(
                "amount must be positive, got {}",
                amount
            )));
        }
        let secret: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();
        Ok(PaymentHandle {
            client_secret: format!("pi_{}_secret_{}", cart_id.as_uuid().simple(), secret),
            amount,
        })
    }
}
