pub mod keyset_refresh;
