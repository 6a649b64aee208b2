use crate::domain::error::DomainError;
use crate::domain::model::{
    CustomerInfo, CustomerProfileId, EmailAddress, Money, OrganizationId, ShippingAddress,
};
use chrono::{DateTime, Utc};

/// 顧客プロファイル
/// (組織, メールアドレス) ごとの非正規化CRM集計。
/// 初回注文で作成され、以降は置き換えずに更新される
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerProfile {
    id: CustomerProfileId,
    organization_id: OrganizationId,
    email: EmailAddress,
    name: String,
    phone: Option<String>,
    address: Option<ShippingAddress>,
    total_orders: u32,
    total_spend: Money,
    first_seen_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
}

impl CustomerProfile {
    /// 初回注文から顧客プロファイルを作成
    pub fn first_order(
        organization_id: OrganizationId,
        customer: &CustomerInfo,
        order_total: Money,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CustomerProfileId::new(),
            organization_id,
            email: customer.email().clone(),
            name: customer.name().to_string(),
            phone: customer.phone().map(str::to_string),
            address: customer.address().cloned(),
            total_orders: 1,
            total_spend: order_total,
            first_seen_at: at,
            last_seen_at: at,
        }
    }

    /// データベースから取得したデータで顧客プロファイルを再構築
    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: CustomerProfileId,
        organization_id: OrganizationId,
        email: EmailAddress,
        name: String,
        phone: Option<String>,
        address: Option<ShippingAddress>,
        total_orders: u32,
        total_spend: Money,
        first_seen_at: DateTime<Utc>,
        last_seen_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            organization_id,
            email,
            name,
            phone,
            address,
            total_orders,
            total_spend,
            first_seen_at,
            last_seen_at,
        }
    }

    /// 後続の注文を集計に反映する
    /// 最新の連絡先情報を正とする。電話番号と住所は入力があった場合のみ上書きする
    pub fn record_order(
        &mut self,
        customer: &CustomerInfo,
        order_total: Money,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if customer.email() != &self.email {
            return Err(DomainError::InvalidInput(format!(
                "顧客プロファイル {} とメールアドレスが一致しません",
                self.id
            )));
        }
        self.total_orders = self
            .total_orders
            .checked_add(1)
            .ok_or_else(|| DomainError::InvalidInput("注文数が上限を超えます".to_string()))?;
        self.total_spend = self.total_spend.add(&order_total)?;
        self.last_seen_at = at;

        self.name = customer.name().to_string();
        if let Some(phone) = customer.phone() {
            self.phone = Some(phone.to_string());
        }
        if let Some(address) = customer.address() {
            self.address = Some(address.clone());
        }
        Ok(())
    }

    pub fn id(&self) -> CustomerProfileId {
        self.id
    }

    pub fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn address(&self) -> Option<&ShippingAddress> {
        self.address.as_ref()
    }

    pub fn total_orders(&self) -> u32 {
        self.total_orders
    }

    pub fn total_spend(&self) -> Money {
        self.total_spend
    }

    pub fn first_seen_at(&self) -> DateTime<Utc> {
        self.first_seen_at
    }

    pub fn last_seen_at(&self) -> DateTime<Utc> {
        self.last_seen_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn info(name: &str, email: &str, phone: Option<&str>) -> CustomerInfo {
        CustomerInfo::new(
            name.to_string(),
            EmailAddress::parse(email).unwrap(),
            phone.map(str::to_string),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_first_order_creates_profile() {
        let now = Utc::now();
        let profile = CustomerProfile::first_order(
            OrganizationId::new(),
            &info("Dana", "dana@example.com", Some("555-0100")),
            Money::new(4200),
            now,
        );
        assert_eq!(profile.total_orders(), 1);
        assert_eq!(profile.total_spend(), Money::new(4200));
        assert_eq!(profile.first_seen_at(), now);
        assert_eq!(profile.last_seen_at(), now);
    }

    #[test]
    fn test_record_order_accumulates_and_refreshes_contact() {
        let first = Utc::now();
        let mut profile = CustomerProfile::first_order(
            OrganizationId::new(),
            &info("Dana", "dana@example.com", Some("555-0100")),
            Money::new(4200),
            first,
        );

        let later = first + Duration::minutes(5);
        profile
            .record_order(&info("Dana Smith", "DANA@example.com", None), Money::new(800), later)
            .unwrap();

        assert_eq!(profile.total_orders(), 2);
        assert_eq!(profile.total_spend(), Money::new(5000));
        assert_eq!(profile.name(), "Dana Smith");
        assert_eq!(profile.phone(), Some("555-0100"));
        assert_eq!(profile.first_seen_at(), first);
        assert_eq!(profile.last_seen_at(), later);
    }

    #[test]
    fn test_record_order_for_other_email_fails() {
        let mut profile = CustomerProfile::first_order(
            OrganizationId::new(),
            &info("Dana", "dana@example.com", None),
            Money::new(100),
            Utc::now(),
        );
        let result = profile.record_order(&info("Eve", "eve@example.com", None), Money::new(1), Utc::now());
        assert!(result.is_err());
        assert_eq!(profile.total_orders(), 1);
    }
}
