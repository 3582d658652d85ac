#[macro_export]
macro_rules! impl_client_methods {
    ($client_name:ident, $entity:ty, $entity_name_snake:ident) => {
        paste::paste! {
            impl $client_name {
                /// Committed state only.
                #[tracing::instrument(skip(self))]
                pub async fn [<get_ $entity_name_snake>](
                    &self,
                    id: <$entity as $crate::actor_framework::Entity>::Id,
                ) -> Result<
                    Option<$entity>,
                    $crate::actor_framework::FrameworkError<<$entity as $crate::actor_framework::Entity>::Error>,
                > {
                    tracing::debug!("Sending request");
                    self.inner.get(None, id).await
                }

                #[tracing::instrument(skip(self))]
                pub async fn [<delete_ $entity_name_snake>](
                    &self,
                    id: <$entity as $crate::actor_framework::Entity>::Id,
                ) -> Result<(), $crate::actor_framework::FrameworkError<<$entity as $crate::actor_framework::Entity>::Error>> {
                    tracing::debug!("Sending request");
                    self.inner.delete(None, id).await
                }
            }
        }
    };
}

#[macro_export]
macro_rules! impl_client_new {
    ($client_name:ident, $entity:ty) => {
        impl $client_name {
            pub fn new(inner: $crate::actor_framework::ResourceClient<$entity>) -> Self {
                Self { inner }
            }

            /// The underlying resource client, e.g. to enlist it in a unit of work.
            pub fn resource(&self) -> $crate::actor_framework::ResourceClient<$entity> {
                self.inner.clone()
            }
        }
    };
}

#[macro_export]
macro_rules! impl_basic_client {
    ($client_name:ident, $entity:ty, $entity_name_snake:ident) => {
        $crate::impl_client_new!($client_name, $entity);
        $crate::impl_client_methods!($client_name, $entity, $entity_name_snake);
    };
}
