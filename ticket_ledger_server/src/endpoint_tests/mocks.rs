use mockall::mock;
use ticket_ledger_engine::traits::{
    Fields,
    NewPaymentIntent,
    PaymentEvent,
    PaymentIntent,
    PaymentProcessor,
    ProcessorError,
    RecordStore,
    RecordStoreError,
    StoreRecord,
    Table,
};
use tlg_common::Currency;

mock! {
    pub Processor {}
    impl PaymentProcessor for Processor {
        async fn create_payment_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, ProcessorError>;
        async fn update_payment_intent_amount(
            &self,
            id: &str,
            amount: Currency,
        ) -> Result<PaymentIntent, ProcessorError>;
        async fn fetch_payment_intent(&self, id: &str) -> Result<PaymentIntent, ProcessorError>;
        fn construct_event(&self, payload: &[u8], signature: &str) -> Result<PaymentEvent, ProcessorError>;
    }
}

mock! {
    pub Store {}
    impl RecordStore for Store {
        async fn query(&self, table: Table, field: &str, value: &str) -> Result<Vec<StoreRecord>, RecordStoreError>;
        async fn list(&self, table: Table) -> Result<Vec<StoreRecord>, RecordStoreError>;
        async fn create(&self, table: Table, fields: Fields) -> Result<String, RecordStoreError>;
        async fn update_partial(&self, table: Table, id: &str, fields: Fields) -> Result<(), RecordStoreError>;
    }
}
