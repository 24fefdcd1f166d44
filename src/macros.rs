/// Builds a [Resource](crate::Resource) from a service name and any number
/// of check items. It's a bit like the vec! macro.
///
/// ```rust
/// # #[macro_use]
/// # extern crate checkkit;
/// # use checkkit::{CheckItem, ServiceState};
/// # fn main() {
/// let i1 = CheckItem::ok("Voltage: 231.0 V");
/// let i2 = CheckItem::new(ServiceState::Warning, "Current: 16.3 A");
/// let resource = resource!["Phase 1"; i1, i2];
/// assert_eq!(resource.state(), ServiceState::Warning);
/// # }
/// ```
#[macro_export]
macro_rules! resource {
    ($name:expr) => {
        $crate::Resource::new($name)
    };
    ($name:expr; $( $item:expr ),+ $(,)?) => {
        {
            let mut r = $crate::Resource::new($name);
            $(
                r.push($item);
            )+
            r
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{CheckItem, ServiceState};

    #[test]
    fn test_resource_macro() {
        let i1 = CheckItem::ok("all good");
        let i2 = i1.clone();

        let _resource = resource!["svc"];
        let resource = resource!["svc"; i1, i2];
        assert_eq!(resource.state(), ServiceState::Ok);
        assert_eq!(resource.items().len(), 2);
    }
}
